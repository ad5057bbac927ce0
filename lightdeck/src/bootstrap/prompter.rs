use crate::error::{Error, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

/// Source of operator answers.
pub trait Prompter {
    /// Picks one of `choices`; `default` is preselected.
    fn choose(&mut self, label: &str, choices: &[String], default: &str) -> Result<String>;

    /// Free text. An empty `default` means no default.
    fn prompt(&mut self, label: &str, default: &str) -> Result<String>;

    fn confirm(&mut self, label: &str, default: bool) -> Result<bool>;
}

#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

fn terminal_error(e: dialoguer::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

impl Prompter for TerminalPrompter {
    fn choose(&mut self, label: &str, choices: &[String], default: &str) -> Result<String> {
        let selected = choices.iter().position(|c| c == default).unwrap_or(0);
        let index = Select::with_theme(&self.theme)
            .with_prompt(label)
            .items(choices)
            .default(selected)
            .interact()
            .map_err(terminal_error)?;
        Ok(choices[index].clone())
    }

    fn prompt(&mut self, label: &str, default: &str) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(terminal_error)
    }

    fn confirm(&mut self, label: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(label)
            .default(default)
            .interact()
            .map_err(terminal_error)
    }
}

/// Replays a fixed list of answers. An empty answer takes the default;
/// `confirm` reads "y"/"n".
#[cfg(test)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    asked: Vec<String>,
    offered: Vec<Vec<String>>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedPrompter {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
            offered: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Choice lists shown so far, one entry per `choose` call.
    pub fn offered(&self) -> &[Vec<String>] {
        &self.offered
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, label: &str) -> Result<String> {
        self.asked.push(label.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| Error::Validation(format!("no scripted answer for {:?}", label)))
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn choose(&mut self, label: &str, choices: &[String], default: &str) -> Result<String> {
        self.offered.push(choices.to_vec());
        let answer = self.next(label)?;
        Ok(if answer.is_empty() { default.to_string() } else { answer })
    }

    fn prompt(&mut self, label: &str, default: &str) -> Result<String> {
        let answer = self.next(label)?;
        Ok(if answer.is_empty() { default.to_string() } else { answer })
    }

    fn confirm(&mut self, label: &str, default: bool) -> Result<bool> {
        match self.next(label)?.as_str() {
            "" => Ok(default),
            "y" => Ok(true),
            "n" => Ok(false),
            other => Err(Error::Validation(format!("not a yes/no answer: {}", other))),
        }
    }
}
