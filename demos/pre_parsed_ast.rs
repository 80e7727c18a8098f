use mathparser_rs::{MathParser, SymbolTable};

fn main() {
    pretty_env_logger::init();

    let mut parser = MathParser::new();

    let expression = "gain * clamp(signal, 1) + offset";
    let evaluator = parser
        .parse_result(expression)
        .expect("Failed to parse");

    // Check what the caller must supply before entering the evaluation loop.
    let unresolved = evaluator.unresolved();
    println!("variables: {:?}", unresolved.variables);
    println!("binary functions: {:?}", unresolved.binary_functions);

    let symbols = SymbolTable::new()
        .with_variable("gain", 2.0)
        .with_variable("offset", 0.5)
        .with_binary_function("clamp", |x, limit| x.clamp(-limit, limit));

    for signal in [-3.0, -0.5, 0.0, 0.75, 4.0] {
        let context = symbols.clone().with_variable("signal", signal);
        match evaluator.eval_result(&context) {
            Ok(result) => println!("signal {}: {}", signal, result),
            Err(err) => println!("Error: {}", err),
        }
    }
}
