//! Esegue una `MinimizerSpec` su un singolo input.
//!
//! Una catena passa il codice di ogni stage al successivo e concatena warning
//! ed errori nell'ordine degli stage. Il primo stage che fallisce ferma la
//! catena; l'output accumulato fin lì viaggia con l'errore. Le implementazioni
//! che vanno in panic sono riportate come fallimenti ordinari.

use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;
use tracing::debug;

use super::{MinifyOutput, MinimizerRegistry, MinimizerSpec};
use crate::error::{panic_message, MinimizeError, Result};

/// Minimize `input` (the content of asset `name`) according to `spec`.
pub fn minify(
    registry: &MinimizerRegistry,
    name: &str,
    input: &str,
    spec: &MinimizerSpec,
) -> Result<MinifyOutput> {
    let mut result = MinifyOutput::code(input);

    for (stage, step) in spec.steps().iter().enumerate() {
        let Some(minimizer) = registry.get(&step.implementation) else {
            return Err(MinimizeError::minimizer(
                anyhow!("Unknown minimizer implementation: {}", step.implementation),
                result,
            ));
        };

        debug!("{}: running stage {} ({})", name, stage, step.implementation);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            minimizer.minify(name, &result.code, &step.options)
        }));

        let stage_output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => return Err(MinimizeError::minimizer(error, result)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                return Err(MinimizeError::minimizer(
                    anyhow!("Minimizer '{}' panicked: {}", step.implementation, message),
                    result,
                ));
            }
        };

        result.code = stage_output.code;
        result.warnings.extend(stage_output.warnings);
        result.errors.extend(stage_output.errors);
    }

    Ok(result)
}
