// Script parser: commands separated by `|`

use super::ast::Script;
use super::command::parse_command;
use super::lexer::ws;
use nom::{
    bytes::complete::tag,
    combinator::eof,
    multi::separated_list1,
    IResult,
};

/// Parse a complete session script
/// Format: command | command | ...
pub fn parse_script(input: &str) -> IResult<&str, Script> {
    let (input, commands) = separated_list1(ws(tag("|")), parse_command)(input)?;

    // Consume trailing whitespace and ensure end of input
    let (input, _) = ws(eof)(input)?;

    Ok((input, Script { commands }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartType;
    use crate::parser::ast::Command;
    use crate::relational::{AggFunc, RelationalOp};

    #[test]
    fn test_parse_single_command() {
        let (_, script) = parse_script("describe()").unwrap();
        assert_eq!(script.commands, vec![Command::Describe]);
    }

    #[test]
    fn test_parse_full_session() {
        let input = "describe() | scatter(height, weight) | groupby(region, mean) | pivot(index: region, columns: year, values: sales)";
        let (_, script) = parse_script(input).unwrap();
        assert_eq!(script.commands.len(), 4);
        match &script.commands[1] {
            Command::Plot(sel) => {
                assert_eq!(sel.chart, ChartType::ScatterPlot);
                assert_eq!(sel.columns, vec!["height", "weight"]);
            }
            other => panic!("Expected Plot command, got {:?}", other),
        }
        assert_eq!(
            script.commands[2],
            Command::Relational(RelationalOp::Groupby {
                column: "region".to_string(),
                func: AggFunc::Mean,
            })
        );
    }

    #[test]
    fn test_parse_multiline_script() {
        let input = "histogram(age)\n  | box(age, income)\n  | count(city)\n";
        let (_, script) = parse_script(input).unwrap();
        assert_eq!(script.commands.len(), 3);
    }

    #[test]
    fn test_parse_script_trailing_pipe() {
        assert!(parse_script("describe() |").is_err());
    }

    #[test]
    fn test_parse_script_empty_input() {
        assert!(parse_script("").is_err());
        assert!(parse_script("   ").is_err());
    }

    #[test]
    fn test_parse_script_trailing_garbage() {
        assert!(parse_script("describe() extra").is_err());
    }
}
