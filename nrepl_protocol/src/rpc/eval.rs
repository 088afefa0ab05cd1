use std::time::Duration;

use super::NreplError;
use crate::message::Message;
use crate::result::EvalResult;

/// Phase of a single `eval` exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    /// Request not yet written.
    Sending,
    /// Request written, reading frames until `done`.
    Collecting,
    /// Server reported `done`.
    Done,
}

/// Bounds on how long an exchange may run. Both default to unbounded, in
/// which case a server that never reports `done` blocks the caller forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalLimits {
    /// Maximum number of response frames to read.
    pub max_frames: Option<usize>,
    /// Deadline for the whole exchange, measured from the write.
    pub timeout: Option<Duration>,
}

impl EvalLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Accumulator state machine for one evaluation.
///
/// `Sending -> Collecting` on [`mark_sent`](Self::mark_sent),
/// `Collecting -> Done` when [`absorb`](Self::absorb) sees a `done` status.
#[derive(Debug, Clone)]
pub struct Evaluation {
    state: EvalState,
    result: EvalResult,
    frames: usize,
    limits: EvalLimits,
}

impl Evaluation {
    pub fn new(limits: EvalLimits) -> Self {
        Self {
            state: EvalState::Sending,
            result: EvalResult::default(),
            frames: 0,
            limits,
        }
    }

    pub fn state(&self) -> EvalState {
        self.state
    }

    pub fn limits(&self) -> EvalLimits {
        self.limits
    }

    /// Frames absorbed so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// What has been collected so far.
    pub fn partial(&self) -> &EvalResult {
        &self.result
    }

    fn require_state(&self, expected: EvalState) -> Result<(), NreplError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(NreplError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    pub fn mark_sent(&mut self) -> Result<(), NreplError> {
        self.require_state(EvalState::Sending)?;
        self.state = EvalState::Collecting;
        Ok(())
    }

    /// Fold one frame in and return the state afterwards.
    pub fn absorb(&mut self, message: &Message) -> Result<EvalState, NreplError> {
        self.require_state(EvalState::Collecting)?;
        self.frames += 1;
        self.result.absorb(message);
        if message.is_done() {
            self.state = EvalState::Done;
            return Ok(self.state);
        }
        self.check_frame_limit()?;
        Ok(self.state)
    }

    /// Count a frame that belongs to some other request without folding it
    /// in. It still uses up the frame budget.
    pub fn skip(&mut self) -> Result<EvalState, NreplError> {
        self.require_state(EvalState::Collecting)?;
        self.frames += 1;
        self.check_frame_limit()?;
        Ok(self.state)
    }

    fn check_frame_limit(&self) -> Result<(), NreplError> {
        match self.limits.max_frames {
            Some(max) if self.frames >= max => Err(NreplError::FrameLimit(max)),
            _ => Ok(()),
        }
    }

    pub fn finish(self) -> Result<EvalResult, NreplError> {
        self.require_state(EvalState::Done)?;
        Ok(self.result)
    }

    /// Turn a failure into the error reported to the caller, attaching
    /// whatever had already been collected.
    pub fn abort(self, error: NreplError) -> NreplError {
        if self.result.is_empty() {
            error
        } else {
            NreplError::Incomplete {
                partial: self.result,
                source: Box::new(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::Value;

    fn done() -> Message {
        Message::new().with("status", vec![Value::from("done")])
    }

    #[test]
    fn starts_in_sending() {
        let eval = Evaluation::new(EvalLimits::unbounded());
        assert_eq!(eval.state(), EvalState::Sending);
        assert_eq!(eval.frames(), 0);
    }

    #[test]
    fn sending_to_collecting() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        eval.mark_sent().unwrap();
        assert_eq!(eval.state(), EvalState::Collecting);
    }

    #[test]
    fn cannot_absorb_before_sending() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        let err = eval.absorb(&done()).unwrap_err();
        assert!(matches!(
            err,
            NreplError::InvalidState {
                expected: EvalState::Collecting,
                actual: EvalState::Sending
            }
        ));
    }

    #[test]
    fn collecting_stays_until_done() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        eval.mark_sent().unwrap();
        let state = eval.absorb(&Message::new().with("out", "hi")).unwrap();
        assert_eq!(state, EvalState::Collecting);
        let state = eval.absorb(&done()).unwrap();
        assert_eq!(state, EvalState::Done);
        assert_eq!(eval.frames(), 2);
    }

    #[test]
    fn done_frame_payload_is_kept() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        eval.mark_sent().unwrap();
        eval.absorb(&done().with("value", "3")).unwrap();
        let result = eval.finish().unwrap();
        assert_eq!(result.values, vec!["3".to_string()]);
    }

    #[test]
    fn finish_requires_done() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        eval.mark_sent().unwrap();
        assert!(matches!(
            eval.finish(),
            Err(NreplError::InvalidState {
                expected: EvalState::Done,
                ..
            })
        ));
    }

    #[test]
    fn absorbing_after_done_is_rejected() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        eval.mark_sent().unwrap();
        eval.absorb(&done()).unwrap();
        assert!(eval.absorb(&done()).is_err());
    }

    #[test]
    fn frame_limit_stops_collection() {
        let limits = EvalLimits {
            max_frames: Some(2),
            timeout: None,
        };
        let mut eval = Evaluation::new(limits);
        eval.mark_sent().unwrap();
        eval.absorb(&Message::new().with("out", "1")).unwrap();
        let err = eval.absorb(&Message::new().with("out", "2")).unwrap_err();
        assert!(matches!(err, NreplError::FrameLimit(2)));
    }

    #[test]
    fn done_on_the_last_allowed_frame_is_fine() {
        let limits = EvalLimits {
            max_frames: Some(1),
            timeout: None,
        };
        let mut eval = Evaluation::new(limits);
        eval.mark_sent().unwrap();
        assert_eq!(eval.absorb(&done()).unwrap(), EvalState::Done);
    }

    #[test]
    fn skipped_frames_use_up_the_limit() {
        let limits = EvalLimits {
            max_frames: Some(3),
            timeout: None,
        };
        let mut eval = Evaluation::new(limits);
        eval.mark_sent().unwrap();
        assert_eq!(eval.skip().unwrap(), EvalState::Collecting);
        eval.absorb(&Message::new().with("out", "mine")).unwrap();
        assert!(matches!(eval.skip(), Err(NreplError::FrameLimit(3))));
        assert_eq!(eval.partial().outputs, vec!["mine".to_string()]);
    }

    #[test]
    fn skip_requires_collecting() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        assert!(matches!(
            eval.skip(),
            Err(NreplError::InvalidState {
                expected: EvalState::Collecting,
                actual: EvalState::Sending
            })
        ));
    }

    #[test]
    fn abort_keeps_partial_output() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        eval.mark_sent().unwrap();
        eval.absorb(&Message::new().with("out", "halfway")).unwrap();
        let err = eval.abort(NreplError::ConnectionClosed);
        match err {
            NreplError::Incomplete { partial, source } => {
                assert_eq!(partial.outputs, vec!["halfway".to_string()]);
                assert!(matches!(*source, NreplError::ConnectionClosed));
            }
            other => panic!("Expected Incomplete, got {:?}", other),
        }
    }

    #[test]
    fn abort_without_output_passes_error_through() {
        let mut eval = Evaluation::new(EvalLimits::unbounded());
        eval.mark_sent().unwrap();
        let err = eval.abort(NreplError::ConnectionClosed);
        assert!(matches!(err, NreplError::ConnectionClosed));
    }
}
