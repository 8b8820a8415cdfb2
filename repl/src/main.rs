use anyhow::Result;
use el_core::{ELError, ELResult};
use el_engine::ELRuntime;
use reedline::{DefaultPrompt, Reedline, Signal};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("==============================================");
    println!(" EL - Exclusion Logic Engine ");
    println!("==============================================");
    println!("Facts: .a.b.c   Exclusions: .a.b!c   Queries: .a.b.c?");
    println!("Commands: ':quit' to exit, ':tree' to dump, ':stats' for metrics.");

    let mut runtime = ELRuntime::new();
    let mut line_editor = Reedline::create();
    let prompt = DefaultPrompt::default();

    loop {
        let sig = line_editor.read_line(&prompt);
        match sig {
            Ok(Signal::Success(buffer)) => {
                let input = buffer.trim();
                if input.is_empty() {
                    continue;
                }
                match input {
                    ":quit" | ":q" => break,
                    ":tree" => {
                        match runtime.dump() {
                            Ok(dump) if dump.is_empty() => println!("(empty)"),
                            Ok(dump) => println!("{dump}"),
                            Err(e) => eprintln!("[!] {e}"),
                        }
                        continue;
                    }
                    ":stats" => {
                        print_stats(&runtime);
                        continue;
                    }
                    _ => {}
                }
                match runtime.run(input) {
                    Ok(results) => {
                        for result in results {
                            print_result(&runtime, &result);
                        }
                    }
                    Err(ELError::Parse {
                        line,
                        col,
                        found,
                        msg,
                    }) => {
                        eprintln!("[!] parse error at {line}:{col} near '{found}': {msg}");
                    }
                    Err(e) => eprintln!("[!] {e}"),
                }
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => {
                println!("Aborting.");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
    Ok(())
}

fn print_result(runtime: &ELRuntime, result: &ELResult) {
    match result {
        ELResult::Fail => println!("no"),
        ELResult::Success(s) => {
            // only show binding tables for queries that bound something
            let has_bindings = s.bindings.iter().any(|slice| !slice.is_empty());
            if !has_bindings {
                println!("yes");
                return;
            }
            println!("yes ({} match{})", s.bindings.len(), plural(s.bindings.len()));
            for slice in s.bindings.iter() {
                let mut parts: Vec<String> = slice
                    .iter()
                    .map(|(name, entry)| {
                        format!(
                            "${} = {}",
                            runtime.interner.resolve(&name),
                            entry.value.render(&runtime.interner)
                        )
                    })
                    .collect();
                parts.sort();
                println!("  {}", parts.join(", "));
            }
        }
    }
}

fn print_stats(runtime: &ELRuntime) {
    match runtime.metrics() {
        Ok(metrics) => {
            println!("depth:       {}", metrics.max_depth);
            println!("leaves:      {}", metrics.leaves.len());
            println!("rules:       {}", metrics.rules.len());
            println!("assertions:  {}", runtime.num_assertions());
            println!("retractions: {}", runtime.num_retractions());
        }
        Err(e) => eprintln!("[!] {e}"),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "es" }
}
