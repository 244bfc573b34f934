//! Requiredness enforcement and the missing-value hook.

use switchboard_schema::{ArgumentSpec, ValueMapping};
use tracing::debug;

use crate::error::GetArgsError;

/// What a missing-value hook asks the enforcer to do next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingAction {
    /// Check requiredness as usual. The hook may have inserted a value.
    #[default]
    Continue,
    /// Leave the argument absent without complaint, even if required.
    Ignore,
}

/// Called once per argument absent after extraction.
pub type MissingHook<'a> = dyn FnMut(&str, &ArgumentSpec, &mut ValueMapping) -> MissingAction + 'a;

/// Run the hook over every absent argument and check requiredness.
///
/// Arguments are visited in canonical-name order. In lenient mode a
/// required argument that stays absent is simply left out.
pub(crate) fn enforce(
    specs: &[ArgumentSpec],
    values: &mut ValueMapping,
    strict: bool,
    mut hook: Option<&mut MissingHook<'_>>,
) -> Result<(), GetArgsError> {
    let mut ordered: Vec<&ArgumentSpec> = specs.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    for spec in ordered {
        if values.contains(&spec.name) {
            continue;
        }
        let action = match hook.as_deref_mut() {
            Some(hook) => hook(&spec.name, spec, values),
            None => MissingAction::Continue,
        };
        if action == MissingAction::Ignore || values.contains(&spec.name) || !spec.required {
            continue;
        }
        if strict {
            return Err(GetArgsError::MissingRequiredArgument {
                arg: spec.name.clone(),
            });
        }
        debug!(arg = %spec.name, "required argument left absent in lenient mode");
    }
    Ok(())
}
