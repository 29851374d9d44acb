//! Continue/stop decision over the research state.

use crate::state::{ResearchState, StopReason};

/// What the controller should do after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Finalize(StopReason),
}

/// Decide whether to run another round.
///
/// The loop bound is checked first so no reflection signal can extend a run
/// past `max_loops`.
pub fn decide(state: &ResearchState) -> Decision {
    if state.loop_count() >= state.max_loops() {
        return Decision::Finalize(StopReason::LoopLimitReached);
    }

    match state.last_reflection() {
        Some(reflection) if !reflection.has_gap => Decision::Finalize(StopReason::NoFurtherGap),
        _ => Decision::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RoundDelta;
    use crate::steps::{QueryGenOutput, ReflectOutput, SummarizeOutput, WebResearchOutput};

    fn after_rounds(max_loops: usize, reflections: Vec<ReflectOutput>) -> ResearchState {
        let mut state = ResearchState::new("topic", max_loops).unwrap();
        for reflection in reflections {
            state.commit_round(RoundDelta {
                query: QueryGenOutput::new("q"),
                research: WebResearchOutput::default(),
                summary: SummarizeOutput {
                    summary: "s".to_string(),
                },
                reflection,
            });
        }
        state
    }

    #[test]
    fn test_fresh_state_continues() {
        let state = ResearchState::new("topic", 1).unwrap();
        assert_eq!(decide(&state), Decision::Continue);
    }

    #[test]
    fn test_gap_continues() {
        let state = after_rounds(3, vec![ReflectOutput::gap("more")]);
        assert_eq!(decide(&state), Decision::Continue);
    }

    #[test]
    fn test_no_gap_finalizes() {
        let state = after_rounds(3, vec![ReflectOutput::complete()]);
        assert_eq!(decide(&state), Decision::Finalize(StopReason::NoFurtherGap));
    }

    #[test]
    fn test_loop_limit_wins_over_gap() {
        let state = after_rounds(2, vec![ReflectOutput::gap("a"), ReflectOutput::gap("b")]);
        assert_eq!(decide(&state), Decision::Finalize(StopReason::LoopLimitReached));
    }

    #[test]
    fn test_loop_limit_wins_over_no_gap() {
        let state = after_rounds(1, vec![ReflectOutput::complete()]);
        assert_eq!(decide(&state), Decision::Finalize(StopReason::LoopLimitReached));
    }
}
