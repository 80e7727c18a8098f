use mathparser_rs::{MathParser, SymbolTable};

fn main() {
    pretty_env_logger::init();

    let mut parser = MathParser::new();
    let evaluator = parser
        .parse_result("4 * sin(t * pi)")
        .expect("Failed to parse");

    let frames: Vec<f64> = (0..=8).map(|i| i as f64 / 8.0).collect();
    for (t, value) in frames.iter().zip(evaluator.eval_batch("t", &frames)) {
        println!("t = {:.3}: {:.6}", t, value);
    }

    let contexts = vec![
        SymbolTable::new().with_variable("t", 0.25),
        SymbolTable::new()
            .with_variable("t", 0.25)
            .with_unary_function("sin", |x| x.cos()),
    ];
    for (i, context) in contexts.iter().enumerate() {
        println!("Result {}: {:?}", i, evaluator.eval_result(context));
    }
}
