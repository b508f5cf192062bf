//! DOT export of triple sets

use crate::triple::Triple;
use std::fmt::Write;

/// Render triples as a directed graph in DOT format. A blank name falls back
/// to `fabric`.
pub fn export_dot(name: &str, triples: &[Triple]) -> String {
    let name = match name.trim() {
        "" => "fabric",
        trimmed => trimmed,
    };

    let mut out = format!("digraph {name} {{\n");
    for triple in triples {
        writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\" weight={:.6}];",
            triple.source, triple.target, triple.predicate, triple.weight
        )
        .ok();
    }
    out.push_str("}\n");
    out
}
