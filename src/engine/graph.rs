use std::collections::HashMap;
use std::io;
use std::process::Command;

use crate::debugger::{BuildHost, SourceLoc};

/// One rule of a buildfile: a target, its prerequisites and its recipe.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub prereqs: Vec<String>,
    pub recipe: Vec<String>,
    pub loc: SourceLoc,
}

/// The dependency graph plus the variable table. Implements [`BuildHost`],
/// so it is also what the debugger consults for target and variable
/// lookups during a session.
#[derive(Debug, Default)]
pub struct BuildGraph {
    targets: HashMap<String, Target>,
    order: Vec<String>,
    variables: HashMap<String, String>,
}

impl BuildGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, target: Target) {
        if !self.targets.contains_key(&target.name) {
            self.order.push(target.name.clone());
        }
        self.targets.insert(target.name.clone(), target);
    }

    pub fn define_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// First target defined in the file, the default goal.
    pub fn first_target(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    fn expand_once(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(at) = rest.find('$') {
            out.push_str(&rest[..at]);
            let tail = &rest[at + 1..];
            let close = match tail.chars().next() {
                Some('(') => ')',
                Some('{') => '}',
                _ => {
                    out.push('$');
                    rest = tail;
                    continue;
                }
            };
            match tail[1..].find(close) {
                Some(end) => {
                    let name = &tail[1..1 + end];
                    // Undefined variables expand to nothing.
                    if let Some(value) = self.variables.get(name) {
                        out.push_str(value);
                    }
                    rest = &tail[end + 2..];
                }
                None => {
                    out.push('$');
                    rest = tail;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl BuildHost for BuildGraph {
    fn resolve_target(&self, name: &str) -> Option<String> {
        self.targets.contains_key(name).then(|| name.to_string())
    }

    fn target_for_line(&self, file: &str, line: u32) -> Option<String> {
        self.order.iter().find_map(|name| {
            let target = &self.targets[name];
            let last = target.loc.line + target.recipe.len() as u32;
            (target.loc.file == file && (target.loc.line..=last).contains(&line))
                .then(|| name.clone())
        })
    }

    fn describe_target(&self, name: &str) -> Option<String> {
        let target = self.targets.get(name)?;
        let mut text = format!("{}: {}", target.name, target.prereqs.join(" "));
        text.push_str(&format!("\n  defined at {}", target.loc));
        if !target.recipe.is_empty() {
            text.push_str("\n  commands:");
            for line in &target.recipe {
                text.push_str("\n\t");
                text.push_str(line);
            }
        }
        Some(text)
    }

    fn lookup_variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }

    fn expand(&self, text: &str) -> String {
        let mut cur = text.to_string();
        // Nested references settle in a few passes; cap to stay safe
        // against self-referential definitions.
        for _ in 0..16 {
            let next = self.expand_once(&cur);
            if next == cur {
                break;
            }
            cur = next;
        }
        cur
    }

    fn assign_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    fn run_shell(&mut self, command: &str) -> io::Result<i32> {
        #[cfg(windows)]
        let status = Command::new("cmd").args(["/C", command]).status()?;
        #[cfg(not(windows))]
        let status = Command::new("sh").args(["-c", command]).status()?;
        Ok(status.code().unwrap_or(-1))
    }
}
