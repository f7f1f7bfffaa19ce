//! Common display utilities for CLI commands.

use std::collections::BTreeSet;

/// One name per line; `empty_message` on stderr when there are none.
pub fn print_names<'a>(names: impl IntoIterator<Item = &'a String>, empty_message: &str) {
    let mut any = false;
    for name in names {
        any = true;
        println!("{name}");
    }
    if !any {
        eprintln!("{empty_message}");
    }
}

/// `label: a b c` on a single line.
pub fn print_group(label: &str, names: &BTreeSet<String>) {
    let joined = names.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
    println!("{label}: {joined}");
}
