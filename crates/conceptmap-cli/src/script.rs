use anyhow::{Context, Result};
use conceptmap_app::{ClickOutcome, Session};
use conceptmap_core::Point;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One recorded annotation gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Click { x: f32, y: f32 },
    Crosslink { x: f32, y: f32 },
    ResetCurrent,
    DeleteCurrent,
    Reset,
    PriorKnowledge { value: Option<i64> },
    Questions { value: Option<i64> },
}

pub fn load(path: &Path) -> Result<Vec<Step>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing script {}", path.display()))
}

/// Replay `steps` against `session`, stopping at the first failure.
pub fn replay(session: &mut Session, steps: &[Step]) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        let outcome = match *step {
            Step::Click { x, y } => Some(session.click(Point::new(x, y))?),
            Step::Crosslink { x, y } => Some(session.crosslink_click(Point::new(x, y))?),
            Step::ResetCurrent => {
                session.reset_current()?;
                None
            }
            Step::DeleteCurrent => {
                session.delete_current()?;
                None
            }
            Step::Reset => {
                session.reset_graph();
                None
            }
            Step::PriorKnowledge { value } => {
                session.set_prior_knowledge(value);
                None
            }
            Step::Questions { value } => {
                session.set_questions(value);
                None
            }
        };
        if outcome == Some(ClickOutcome::Ignored) {
            tracing::warn!("Step {} ({:?}) had no effect", index + 1, step);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_replay() -> Result<()> {
        let steps: Vec<Step> = serde_json::from_str(
            r#"[
                { "op": "click", "x": 0, "y": 0 },
                { "op": "click", "x": 200, "y": 0 },
                { "op": "reset_current" },
                { "op": "click", "x": 0, "y": 0 },
                { "op": "click", "x": 0, "y": 200 },
                { "op": "crosslink", "x": 200, "y": 0 },
                { "op": "prior_knowledge", "value": 3 },
                { "op": "questions", "value": null }
            ]"#,
        )?;
        assert_eq!(steps[2], Step::ResetCurrent);

        let mut session = Session::default();
        replay(&mut session, &steps)?;

        let metrics = session.metrics();
        assert_eq!(metrics.num_nodes, 3);
        assert_eq!(metrics.num_main_ideas, 2);
        assert_eq!(metrics.num_crosslinks, 1);
        assert_eq!(metrics.max_crosslink_dist, 2);
        assert_eq!(session.model().prior_knowledge(), Some(3));
        Ok(())
    }
}
