//! Attribute writes through an ordered alias list.

use crate::document::{CadDocument, DocumentError, Selection};

/// Writes one logical attribute that the host may know under several names.
///
/// The first write tries each alias in order. The alias that succeeds is
/// kept and used alone for every later write in the run.
#[derive(Debug)]
pub struct AliasWriter<'a> {
    aliases: &'a [String],
    resolved: Option<&'a str>,
}

impl<'a> AliasWriter<'a> {
    pub fn new(aliases: &'a [String]) -> Self {
        Self {
            aliases,
            resolved: None,
        }
    }

    /// The alias in use, once a write has succeeded
    pub fn resolved(&self) -> Option<&'a str> {
        self.resolved
    }

    /// Alias to read the current value from
    pub fn read<D: CadDocument + ?Sized>(
        &self,
        selection: &Selection<'_, D>,
    ) -> Result<Option<String>, DocumentError> {
        match self.resolved {
            Some(alias) => Ok(selection
                .attribute(alias)?
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())),
            None => read_first(selection, self.aliases),
        }
    }

    /// Write `value`, returning the alias that took it.
    pub fn write<D: CadDocument + ?Sized>(
        &mut self,
        selection: &mut Selection<'_, D>,
        value: &str,
    ) -> Result<&'a str, DocumentError> {
        if let Some(alias) = self.resolved {
            selection.set_attribute(alias, value)?;
            return Ok(alias);
        }

        let aliases = self.aliases;
        let mut last_error = DocumentError::Unsupported("no attribute alias configured");
        for alias in aliases.iter().filter(|a| !a.trim().is_empty()) {
            match selection.set_attribute(alias, value) {
                Ok(()) => {
                    tracing::info!("Writing attribute '{}'", alias);
                    self.resolved = Some(alias.as_str());
                    return Ok(alias.as_str());
                }
                Err(e) => {
                    tracing::debug!("Attribute '{}' not accepted: {}", alias, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

/// First non-empty value among `aliases`, trimmed.
pub fn read_first<D: CadDocument + ?Sized>(
    selection: &Selection<'_, D>,
    aliases: &[String],
) -> Result<Option<String>, DocumentError> {
    for alias in aliases.iter().filter(|a| !a.trim().is_empty()) {
        if let Some(value) = selection.attribute(alias)? {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(Some(value.to_string()));
            }
        }
    }
    Ok(None)
}
