// src/system/ui.rs
//
// Terminal implementations of the interactive collaborators, built on
// dialoguer. Esc/`q` dismissal maps to `Ok(None)`, the engine's
// cancellation value; a confirmed empty multiselect stays `Some(vec![])`,
// which is a completed zero-item selection, not a cancellation.

use colored::Colorize;
use dialoguer::{Input, MultiSelect, Select, theme::ColorfulTheme};

use crate::context::{PickRequest, Picker, Reporter, TextPrompt};

const CUSTOM_ENTRY: &str = "(enter a custom value)";

#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn warn(&self, message: &str) {
        log::warn!("{message}");
        eprintln!("{} {message}", "warning:".yellow().bold());
    }
}

#[derive(Debug, Default)]
pub struct DialoguerPicker;

impl DialoguerPicker {
    fn rows(request: &PickRequest) -> Vec<String> {
        request
            .items
            .iter()
            .map(|item| match &item.description {
                Some(description) => format!("{}  {}", item.label, description.dimmed()),
                None => item.label.clone(),
            })
            .collect()
    }

    /// Maps checked row indices back to item values. An index past the real
    /// items is the appended custom-value row.
    fn selected_values(request: &PickRequest, indices: &[usize]) -> (Vec<String>, bool) {
        let mut values = Vec::new();
        let mut custom = false;
        for &index in indices {
            match request.items.get(index) {
                Some(item) => values.push(item.value.clone()),
                None => custom = true,
            }
        }
        (values, custom)
    }

    fn custom_value(theme: &ColorfulTheme) -> anyhow::Result<String> {
        Ok(Input::with_theme(theme)
            .with_prompt("Custom value".to_string())
            .allow_empty(true)
            .interact_text()?)
    }
}

impl Picker for DialoguerPicker {
    fn pick(&self, request: &PickRequest) -> anyhow::Result<Option<Vec<String>>> {
        let theme = ColorfulTheme::default();
        let prompt = request
            .placeholder
            .clone()
            .unwrap_or_else(|| "Select a value".to_string());
        let mut rows = Self::rows(request);
        if request.allow_custom {
            rows.push(CUSTOM_ENTRY.dimmed().to_string());
        }

        if request.multiselect {
            let mut defaults: Vec<bool> = request
                .items
                .iter()
                .map(|item| request.preselected.contains(&item.value))
                .collect();
            defaults.resize(rows.len(), false);
            let picked = MultiSelect::with_theme(&theme)
                .with_prompt(prompt)
                .items(&rows)
                .defaults(&defaults)
                .interact_opt()?;
            let indices = match picked {
                Some(indices) => indices,
                None => return Ok(None),
            };
            let (mut values, custom) = Self::selected_values(request, &indices);
            if custom {
                values.push(Self::custom_value(&theme)?);
            }
            return Ok(Some(values));
        }

        let default_index = request
            .items
            .iter()
            .position(|item| request.preselected.contains(&item.value))
            .unwrap_or(0);
        let picked = Select::with_theme(&theme)
            .with_prompt(prompt)
            .items(&rows)
            .default(default_index)
            .interact_opt()?;

        let index = match picked {
            Some(index) => index,
            None => return Ok(None),
        };
        match request.items.get(index) {
            Some(item) => Ok(Some(vec![item.value.clone()])),
            // Past the end of the real items: the custom-value entry.
            None => Ok(Some(vec![Self::custom_value(&theme)?])),
        }
    }
}

#[derive(Debug, Default)]
pub struct DialoguerPrompt;

impl TextPrompt for DialoguerPrompt {
    fn prompt(&self, text: &str, initial: &str) -> anyhow::Result<Option<String>> {
        let answer: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(text.to_string())
            .with_initial_text(initial.to_string())
            .allow_empty(true)
            .interact_text()?;
        Ok(Some(answer))
    }
}
