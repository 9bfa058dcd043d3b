use clap::Parser;
use std::io::Read;

use script_engine::{Callbacks, Context, ErrorCode, Value, ValueKind};

#[derive(Parser)]
#[command(name = "script-engine")]
#[command(about = "An embeddable tree-walking script engine")]
#[command(version)]
struct Cli {
    /// Execute the script from a command-line argument
    #[arg(short = 'c')]
    script: Option<String>,

    /// Output the result as JSON (errorCode, errorMessage, returnValue)
    #[arg(long = "json")]
    json: bool,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let script = if let Some(s) = cli.script {
        s
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error: Cannot read script file: {file}: {e}");
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: No script provided. Use -c 'script', provide a script file, or pipe via stdin.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).unwrap_or_default();
        buf
    };

    let callbacks = Callbacks {
        execute_command: Some(Box::new(|line: &str| -> u32 {
            match std::process::Command::new("sh").arg("-c").arg(line).status() {
                Ok(status) => status.code().unwrap_or(-1) as u32,
                Err(_) => u32::MAX,
            }
        })),
        ..Callbacks::default()
    };

    let mut ctx = Context::new(callbacks);
    let code = ctx.execute(&script);

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "errorCode": format!("{code}"),
                "errorMessage": ctx.error_message(),
                "hasReturnValue": ctx.has_return_value(),
                "returnValue": ctx.return_value().map(value_to_json),
            })
        );
    } else if code != ErrorCode::Ok {
        eprintln!("{}", ctx.error_message());
    } else if let Some(v) = ctx.return_value() {
        println!("{}", display_value(v));
    }

    std::process::exit(if code == ErrorCode::Ok { 0 } else { 1 });
}

fn display_value(v: &Value) -> String {
    match &v.kind {
        ValueKind::Integer(i) => i.to_string(),
        ValueKind::Float(f) => f.to_string(),
        ValueKind::Str(s) => s.to_string(),
        ValueKind::Array(_) => "[array]".to_string(),
        ValueKind::Host(_) => "[host handle]".to_string(),
    }
}

fn value_to_json(v: &Value) -> serde_json::Value {
    match &v.kind {
        ValueKind::Integer(i) => serde_json::json!(i),
        ValueKind::Float(f) => serde_json::json!(f),
        ValueKind::Str(s) => serde_json::json!(s.to_string()),
        ValueKind::Array(_) => serde_json::Value::String("[array]".to_string()),
        ValueKind::Host(_) => serde_json::Value::String("[host handle]".to_string()),
    }
}
