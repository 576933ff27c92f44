#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "crossvm-bench".bright_cyan().bold());
    println!("{}", "-------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but the tooling lives in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!("  - {}  generate the account key files", "crossvm-keygen".bright_white());
    println!("  - {}  write a transaction batch for a workload or mix", "crossvm-generate".bright_white());
    println!("  - {}  inspect and audit a batch file", "crossvm-inspect".bright_white());
    println!("  - {}  fund the account pool on a running node", "crossvm-fund".bright_white());
    println!("  - {}  run an experiment suite, or compute TPS", "crossvm-runner".bright_white());
    println!("  - {}  executor performance harness", "crossvm-perf".bright_white());
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --release --bin crossvm-generate -- --mix salad_native_coin_e80_m20".italic());
}
