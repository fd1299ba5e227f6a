use crate::errors;

use super::{env::Environment, fun::Arity, Callable, Value};

pub(super) fn install(globals: &Environment) {
    globals.define(
        "clock",
        Value::Callable(Callable::native("clock", Arity::Fixed(0), |_, _| {
            let offset = std::time::SystemTime::now()
                .duration_since(std::time::SystemTime::UNIX_EPOCH)
                .map_err(|_| errors::native("The system clock is set to a time before 1970-01-01T00:00:00Z."))?;

            Ok(Value::Number(offset.as_secs_f64()))
        })),
    );

    globals.define(
        "exit",
        Value::Callable(Callable::native("exit", Arity::Fixed(1), |interpreter, args| {
            let code = args
                .first()
                .and_then(Value::as_number)
                .ok_or_else(|| errors::native("Exit code must be a number."))?;

            interpreter.flush();
            tracing::debug!(code, "script requested exit");
            std::process::exit(code as i32)
        })),
    );

    globals.define(
        "print",
        Value::Callable(Callable::native("print", Arity::Variadic, |interpreter, args| {
            let text = args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().join(" ");
            interpreter.write_line(&text)?;
            Ok(Value::Nil)
        })),
    );
}
