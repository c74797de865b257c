pub mod highlighter;

use rustyline::error::ReadlineError;
use rustyline::Editor;

use crate::ast::Program;
use crate::eval::value::Value;
use crate::eval::Runtime;
use crate::parse_source;

use highlighter::EzHelper;

pub fn run_repl() -> Result<(), Box<dyn std::error::Error>> {
    let config = rustyline::Config::builder()
        .auto_add_history(true)
        .build();

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(EzHelper));

    let history_path = history_file().unwrap_or_default();
    let _ = rl.load_history(&history_path);

    // One runtime for the whole session so declarations persist.
    let mut runtime = Runtime::new(Program::default());

    println!(
        "\x1b[1;35mEzLang\x1b[0m v{}",
        env!("CARGO_PKG_VERSION")
    );
    println!("Type \x1b[1m.help\x1b[0m for help, \x1b[1m.exit\x1b[0m to quit\n");

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            "\x1b[1;35mez>\x1b[0m "
        } else {
            "\x1b[1;35m...\x1b[0m "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim_end();

                if buffer.is_empty() && line.is_empty() {
                    continue;
                }

                // Commands are only recognized on the first line of an input.
                if buffer.is_empty() {
                    match line.trim() {
                        ".exit" | ".quit" => break,
                        ".help" => {
                            print_help();
                            continue;
                        }
                        ".vars" => {
                            print_vars(&runtime);
                            continue;
                        }
                        ".clear" => {
                            runtime = Runtime::new(Program::default());
                            println!("  \x1b[33m(environment cleared)\x1b[0m");
                            continue;
                        }
                        _ => {}
                    }
                }

                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(line);

                if !is_complete(&buffer) {
                    continue;
                }

                let source = std::mem::take(&mut buffer);
                eval_input(&mut runtime, &source);
            }
            Err(ReadlineError::Interrupted) => {
                if !buffer.is_empty() {
                    buffer.clear();
                    println!("  \x1b[33m(input cancelled)\x1b[0m");
                } else {
                    println!("^C");
                }
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    println!("Goodbye!");
    Ok(())
}

fn eval_input(runtime: &mut Runtime, source: &str) {
    let parsed = match parse_source(source) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e.render(source, "<repl>"));
            return;
        }
    };
    if !parsed.is_clean() {
        for e in &parsed.errors {
            eprintln!("{}", e.render(source, "<repl>"));
        }
        return;
    }

    match runtime.eval_program(&parsed.program) {
        Ok(Value::Null) => {}
        Ok(value) => println!("  \x1b[1m{:?}\x1b[0m", value),
        Err(e) => eprintln!("{}", e.render(source, "<repl>")),
    }
}

/// Whether the input so far can be parsed: no open delimiter and no
/// unterminated string.
pub fn is_complete(source: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == '\\' {
                chars.next();
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '/' if chars.peek() == Some(&'/') => {
                // Skip the comment up to the end of the line.
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && quote.is_none()
}

fn print_vars(runtime: &Runtime) {
    let globals = runtime.globals();
    let mut any = false;
    for name in globals.names() {
        match globals.get_local(&name) {
            Some(Value::Native(_)) | None => {}
            Some(value) => {
                println!("  {} = {:?}", name, value);
                any = true;
            }
        }
    }
    if !any {
        println!("  (no variables)");
    }
}

fn print_help() {
    println!("\x1b[1mEzLang REPL Commands:\x1b[0m");
    println!("  .help              Show this help message");
    println!("  .vars              List global variables");
    println!("  .clear             Reset the environment");
    println!("  .exit, .quit       Leave the REPL");
    println!();
    println!("\x1b[1mLanguage:\x1b[0m");
    println!("  var x = 42                              Declare a variable");
    println!("  function add(a, b) {{ return a + b }}     Define a function");
    println!("  if x > 0 {{ ... }} else {{ ... }}           Conditional");
    println!("  for item in [1, 2, 3] {{ ... }}           Loop over an array");
    println!("  while n < 10 {{ n = n + 1 }}               Loop on a condition");
    println!("  {{ name: \"Ada\", age: 36 }}                 Object literal");
    println!("  import \"utils\"                            Run utils.ez into this session");
    println!();
    println!("\x1b[1mBuilt-in Functions:\x1b[0m");
    println!("  print, length, type, str, num, range, random, wait, get_argument");
    println!("  push, pop, keys, join, split, contains, upper, lower");
    println!("  abs, floor, ceil, round, sqrt, min, max, pow");
    println!();
    println!("Open braces, brackets, parens or strings continue onto the next line.");
}

fn history_file() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(|h| std::path::PathBuf::from(h).join(".ezlang_history"))
}

#[cfg(test)]
mod tests {
    use super::is_complete;

    #[test]
    fn open_brace_needs_more_input() {
        assert!(!is_complete("function f() {"));
        assert!(is_complete("function f() {\n return 1\n}"));
    }

    #[test]
    fn braces_inside_strings_and_comments_are_ignored() {
        assert!(is_complete("var s = \"{\""));
        assert!(is_complete("var s = 'it\\'s' // {"));
        assert!(!is_complete("var s = \"unterminated"));
    }
}
