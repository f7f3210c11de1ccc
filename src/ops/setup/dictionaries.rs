//! Edge dictionaries declared in `[setup.dictionaries]`.

use std::collections::BTreeMap;

use crate::api::RemoteApi;
use crate::core::errors::{Error, Result};
use crate::core::manifest::DictionarySetup;
use crate::ops::setup::{Provisioner, Target};
use crate::ops::undo::UndoStack;
use crate::util::context::Flags;
use crate::util::prompt::Prompt;
use crate::util::shell::{Shell, Status};

/// A dictionary and the items to seed it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPlan {
    pub name: String,
    pub items: Vec<(String, String)>,
}

/// Sets up the dictionaries of a new service.
#[derive(Debug)]
pub struct Dictionaries {
    target: Target,
    setup: BTreeMap<String, DictionarySetup>,
    flags: Flags,
    required: Vec<DictionaryPlan>,
}

impl Dictionaries {
    pub fn new(target: Target, setup: BTreeMap<String, DictionarySetup>, flags: Flags) -> Self {
        Dictionaries {
            target,
            setup,
            flags,
            required: Vec::new(),
        }
    }

    pub fn required(&self) -> &[DictionaryPlan] {
        &self.required
    }
}

impl Provisioner for Dictionaries {
    fn resource(&self) -> &'static str {
        "dictionary"
    }

    fn predefined(&self) -> bool {
        !self.setup.is_empty()
    }

    /// New services start without dictionaries, so every declared one is missing.
    fn missing(&self) -> bool {
        self.predefined()
    }

    fn configure(&mut self, prompt: &mut dyn Prompt, shell: &Shell) -> Result<()> {
        let interactive = self.flags.prompts_allowed();
        self.required.clear();

        for (name, setup) in &self.setup {
            if interactive {
                if let Some(description) = &setup.description {
                    shell.note(format!("{}: {}", name, description));
                }
            }

            let mut items = Vec::with_capacity(setup.items.len());
            for (key, item) in &setup.items {
                let default = item.value.clone().unwrap_or_default();
                let value = if interactive {
                    if let Some(description) = &item.description {
                        shell.note(description);
                    }
                    prompt.input(&format!("Value for '{}' in '{}'", key, name), Some(&default))?
                } else {
                    default
                };
                items.push((key.clone(), value));
            }

            self.required.push(DictionaryPlan {
                name: name.clone(),
                items,
            });
        }
        Ok(())
    }

    fn create<'a>(
        &self,
        api: &'a dyn RemoteApi,
        shell: &Shell,
        undo: &mut UndoStack<'a>,
    ) -> Result<()> {
        let service_id = &self.target.service_id;
        let version = self.target.version;

        for plan in &self.required {
            let spinner = shell.spinner(Status::Creating, format!("dictionary '{}'...", plan.name));
            let dictionary = api
                .create_dictionary(service_id, version, &plan.name)
                .map_err(|e| Error::remote(format!("error creating dictionary '{}'", plan.name), e))?;

            // Items are deleted along with their dictionary.
            let owner = service_id.clone();
            let name = plan.name.clone();
            undo.push(format!("delete dictionary {}", plan.name), move || {
                api.delete_dictionary(&owner, version, &name)?;
                Ok(())
            });

            for (key, value) in &plan.items {
                api.create_dictionary_item(service_id, &dictionary.id, key, value)
                    .map_err(|e| {
                        Error::remote(
                            format!("error creating item '{}' in dictionary '{}'", key, plan.name),
                            e,
                        )
                    })?;
            }
            spinner.finish();
            shell.status(Status::Created, format!("dictionary '{}'", plan.name));
        }
        Ok(())
    }
}
