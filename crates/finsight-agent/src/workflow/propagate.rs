use tracing::warn;

use finsight_core::types::RequestData;

use super::builder::{GOAL_PLANNING_STEP, SPENDING_ANALYSIS_STEP};
use super::state::StepResults;

/// Dependency steps whose data payload is also exposed under the step id.
const SEMANTIC_ALIASES: [&str; 2] = [SPENDING_ANALYSIS_STEP, GOAL_PLANNING_STEP];

/// Key holding a dependency's full response.
pub fn result_key(dep_id: &str) -> String {
    format!("{}_result", dep_id)
}

/// Inject completed dependency results into a step's request payload.
///
/// Each dependency with a recorded result lands under `<dep>_result` as the
/// full serialized response; the well-known analysis steps additionally get
/// their bare `data` map under the step id itself. Dependencies without a
/// result are skipped. Re-running on the same inputs yields the same payload.
///
/// Returns the number of dependencies injected.
pub fn propagate_results(
    request: &mut RequestData,
    depends_on: &[String],
    results: &StepResults,
) -> usize {
    let mut injected = 0;

    for dep_id in depends_on {
        let Some(response) = results.get(dep_id) else {
            continue;
        };

        match serde_json::to_value(response) {
            Ok(full) => {
                request.insert(result_key(dep_id), full);
            }
            Err(e) => {
                warn!(dep_id = %dep_id, error = %e, "Could not serialize dependency result");
                continue;
            }
        }

        if SEMANTIC_ALIASES.contains(&dep_id.as_str()) {
            request.insert(dep_id.clone(), response.data_value());
        }
        injected += 1;
    }

    injected
}
