use thiserror::Error;

use super::graph::{BuildGraph, Target};
use crate::debugger::SourceLoc;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{file}:{line}: recipe line outside of a rule")]
    RecipeOutsideRule { file: String, line: u32 },
    #[error("{file}:{line}: not a rule, variable assignment or recipe: {text}")]
    Unrecognized {
        file: String,
        line: u32,
        text: String,
    },
}

/// Parse a buildfile: `NAME = value` assignments, `target: prereqs` rule
/// headers, tab-indented recipe lines, `#` comments.
pub fn parse_buildfile(file: &str, text: &str) -> Result<BuildGraph, ParseError> {
    let mut graph = BuildGraph::new();
    let mut current: Option<Target> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i as u32 + 1;

        if raw.starts_with('\t') {
            let recipe_line = raw.trim();
            if recipe_line.is_empty() {
                continue;
            }
            match current.as_mut() {
                Some(target) => target.recipe.push(recipe_line.to_string()),
                None => {
                    return Err(ParseError::RecipeOutsideRule {
                        file: file.to_string(),
                        line: line_no,
                    })
                }
            }
            continue;
        }

        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // An '=' before any ':' makes the line an assignment.
        let colon = line.find(':');
        let eq = line.find('=');
        let is_assignment = match (eq, colon) {
            (Some(e), Some(c)) => e < c,
            (Some(_), None) => true,
            _ => false,
        };

        if is_assignment {
            let e = eq.unwrap_or_default();
            let name = line[..e].trim();
            if !name.is_empty() && !name.contains(char::is_whitespace) {
                graph.define_variable(name, line[e + 1..].trim());
                continue;
            }
        } else if let Some(c) = colon {
            // A rule header ends the previous rule.
            if let Some(done) = current.take() {
                graph.add_target(done);
            }
            let name = line[..c].trim().to_string();
            let prereqs = line[c + 1..]
                .split_whitespace()
                .map(str::to_string)
                .collect();
            current = Some(Target {
                name,
                prereqs,
                recipe: Vec::new(),
                loc: SourceLoc::new(file, line_no),
            });
            continue;
        }

        return Err(ParseError::Unrecognized {
            file: file.to_string(),
            line: line_no,
            text: line.to_string(),
        });
    }

    if let Some(done) = current.take() {
        graph.add_target(done);
    }
    Ok(graph)
}
