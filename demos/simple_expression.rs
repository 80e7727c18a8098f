use log::debug;
use mathparser_rs::{MathParser, MathParserError};

fn main() {
    pretty_env_logger::init();

    let mut parser = MathParser::new();

    for expr in ["2 + 3 * 4", "2^3^2", "4! - 1", "if(pi > 3, 1, 0)", "sin(pi / 6)"] {
        match parser.parse_result(expr) {
            Ok(evaluator) => {
                debug!("tree: {:?}", evaluator.token());
                println!("{} = {}", expr, evaluator.value());
            }
            Err(err) => println!("{}: {}", expr, err),
        }
    }

    // Assignments store their value in the parser for later expressions.
    if let Some(radius) = parser.parse("r = 2") {
        println!("r = {}", radius.value());
    }
    if let Some(area) = parser.parse("pi * r^2") {
        println!("area = {}", area.value());
    }

    if let Err(MathParserError::ParseFailure { context, .. }) = parser.parse_result("(1 + 2") {
        println!("{}", context);
    }
}
