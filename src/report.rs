// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Shared reporting helpers for parse errors and runtime faults.

use crate::interpret::RuntimeFault;
use crate::parse::ParseError;

pub fn highlight_line(line: &str, column: Option<usize>, use_color: bool) -> String {
    match column {
        Some(col) if col > 0 => {
            let idx = col - 1;
            if idx >= line.len() {
                if use_color {
                    return format!("{line}\x1b[31m^\x1b[0m");
                }
                return format!("{line}^");
            }
            let (head, tail) = line.split_at(idx);
            let ch = tail.chars().next().unwrap_or(' ');
            let rest = &tail[ch.len_utf8()..];
            if use_color {
                format!("{head}\x1b[31m{ch}\x1b[0m{rest}")
            } else {
                format!("{head}{ch}{rest}")
            }
        }
        _ => line.to_string(),
    }
}

pub fn format_parse_error(
    err: &ParseError,
    file: Option<&str>,
    lines: Option<&[String]>,
    use_color: bool,
) -> String {
    let header = match file {
        Some(file) => format!("{file}:{}: ERROR", err.line),
        None => format!("{}: ERROR", err.line),
    };

    let mut out = String::new();
    out.push_str(&header);
    out.push('\n');
    out.push_str(&source_excerpt(err.line, Some(err.col as usize), lines, use_color));
    out.push('\n');
    out.push_str(&format!("ERROR: {}", err.message));
    out
}

pub fn format_runtime_fault(
    fault: &RuntimeFault,
    file: Option<&str>,
    lines: Option<&[String]>,
    use_color: bool,
) -> String {
    let mut out = String::new();
    match (file, fault.line) {
        (Some(file), Some(line)) => out.push_str(&format!("{file}:{line}: FAULT\n")),
        (Some(file), None) => out.push_str(&format!("{file}: FAULT\n")),
        (None, Some(line)) => out.push_str(&format!("{line}: FAULT\n")),
        (None, None) => out.push_str("FAULT\n"),
    }
    if let Some(line) = fault.line {
        out.push_str(&source_excerpt(line, None, lines, use_color));
        out.push('\n');
    }
    out.push_str(&format!("FAULT: {}", fault.message));
    out
}

fn source_excerpt(
    line_num: u32,
    column: Option<usize>,
    lines: Option<&[String]>,
    use_color: bool,
) -> String {
    let line_idx = line_num.saturating_sub(1) as usize;
    let line_text = lines
        .and_then(|lines| lines.get(line_idx))
        .map(|s| s.as_str())
        .unwrap_or("<source unavailable>");
    let highlighted = highlight_line(line_text, column, use_color);
    format!("{line_num:>5} | {highlighted}")
}
