// Command parsers for session scripts

use super::ast::Command;
use super::lexer::{column_name, identifier, ws};
use crate::chart::ChartType;
use crate::relational::{AggFunc, RelationalOp};
use crate::selection::Selection;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::map_res,
    multi::separated_list0,
    sequence::preceded,
    IResult,
};

/// Parse the describe command
/// Format: describe()
pub fn parse_describe(input: &str) -> IResult<&str, Command> {
    let (input, _) = ws(tag("describe"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, Command::Describe))
}

/// Parse a groupby command
/// Format: groupby(region, mean)
pub fn parse_groupby(input: &str) -> IResult<&str, Command> {
    let (input, _) = ws(tag("groupby"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, column) = ws(column_name)(input)?;
    let (input, _) = ws(char(','))(input)?;
    let (input, func) = ws(map_res(identifier, |f| f.parse::<AggFunc>()))(input)?;
    let (input, _) = ws(char(')'))(input)?;

    Ok((
        input,
        Command::Relational(RelationalOp::Groupby { column, func }),
    ))
}

/// Parse a pivot command; the aggregation is always mean
/// Format: pivot(index: region, columns: year, values: sales)
pub fn parse_pivot(input: &str) -> IResult<&str, Command> {
    let (input, _) = ws(tag("pivot"))(input)?;
    let (input, _) = ws(char('('))(input)?;

    let (input, index) = preceded(ws(tag("index:")), ws(column_name))(input)?;
    let (input, _) = ws(char(','))(input)?;
    let (input, columns) = preceded(ws(tag("columns:")), ws(column_name))(input)?;
    let (input, _) = ws(char(','))(input)?;
    let (input, values) = preceded(ws(tag("values:")), ws(column_name))(input)?;

    let (input, _) = ws(char(')'))(input)?;

    Ok((
        input,
        Command::Relational(RelationalOp::Pivot {
            index,
            columns,
            values,
        }),
    ))
}

/// Parse a chart command
/// Format: scatter(height, weight) or histogram("unit price")
pub fn parse_plot(input: &str) -> IResult<&str, Command> {
    let (input, chart) = ws(map_res(identifier, |name| name.parse::<ChartType>()))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, columns) = separated_list0(ws(char(',')), ws(column_name))(input)?;
    let (input, _) = ws(char(')'))(input)?;

    Ok((input, Command::Plot(Selection::new(chart, columns))))
}

/// Parse any command
pub fn parse_command(input: &str) -> IResult<&str, Command> {
    alt((parse_describe, parse_groupby, parse_pivot, parse_plot))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_describe() {
        assert_eq!(parse_describe("describe()"), Ok(("", Command::Describe)));
        assert_eq!(parse_describe(" describe( ) "), Ok(("", Command::Describe)));
        assert!(parse_describe("describe").is_err());
    }

    #[test]
    fn test_parse_groupby() {
        let (_, cmd) = parse_groupby("groupby(region, sum)").unwrap();
        assert_eq!(
            cmd,
            Command::Relational(RelationalOp::Groupby {
                column: "region".to_string(),
                func: AggFunc::Sum,
            })
        );
    }

    #[test]
    fn test_parse_groupby_unknown_function() {
        assert!(parse_groupby("groupby(region, median)").is_err());
    }

    #[test]
    fn test_parse_pivot() {
        let (_, cmd) = parse_pivot(r#"pivot(index: region, columns: "fiscal year", values: sales)"#).unwrap();
        assert_eq!(
            cmd,
            Command::Relational(RelationalOp::Pivot {
                index: "region".to_string(),
                columns: "fiscal year".to_string(),
                values: "sales".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_pivot_rejects_aggfunc() {
        assert!(parse_pivot("pivot(index: a, columns: b, values: c, aggfunc: sum)").is_err());
    }

    #[test]
    fn test_parse_plot() {
        let (_, cmd) = parse_plot(r#"scatter(height, "body weight")"#).unwrap();
        match cmd {
            Command::Plot(sel) => {
                assert_eq!(sel.chart, ChartType::ScatterPlot);
                assert_eq!(sel.columns, vec!["height", "body weight"]);
            }
            _ => panic!("Expected Plot command"),
        }
    }

    #[test]
    fn test_parse_plot_no_columns() {
        let (_, cmd) = parse_plot("heatmap()").unwrap();
        assert_eq!(cmd, Command::Plot(Selection::new(ChartType::Heatmap, vec![])));
    }

    #[test]
    fn test_parse_plot_reserved_type() {
        // Reserved types still parse; the resolver decides they draw nothing
        let (_, cmd) = parse_plot("radar(a, b)").unwrap();
        assert!(matches!(cmd, Command::Plot(Selection { chart: ChartType::RadarChart, .. })));
    }

    #[test]
    fn test_parse_plot_unknown_chart() {
        assert!(parse_plot("sunburst(a)").is_err());
    }

    #[test]
    fn test_parse_command_dispatch() {
        assert_eq!(parse_command("describe()").unwrap().1, Command::Describe);
        assert!(matches!(parse_command("density(x)").unwrap().1, Command::Plot(_)));
        assert!(matches!(parse_command("count(x)").unwrap().1, Command::Plot(_)));
    }
}
