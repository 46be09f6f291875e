//! Change Watcher
//!
//! Decides *when* a scan pass runs. The host feeds it triggers (page load,
//! qualifying DOM insertions, rule updates) and the current time in
//! milliseconds; the watcher answers with the next deadline and hands out a
//! [`PassTicket`] once a pass is due. A scan that finds no candidates is
//! retried with backoff a bounded number of times, then dropped silently.
//!
//! Every new trigger supersedes whatever was pending: only the latest
//! generation's pass is honored.

use serde::{Deserialize, Serialize};

/// What caused a pass to be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Content script injected; the page may still be rendering.
    PageLoad,
    /// Candidate-shaped elements were inserted.
    Mutation,
    /// A new filter config arrived.
    RulesUpdated,
    /// Previous pass found no candidates.
    Retry,
}

/// Timing knobs for scheduling and retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Delay before the first pass after injection.
    pub initial_delay_ms: u64,
    /// Delay between a trigger and its pass, to let late content render.
    pub settle_delay_ms: u64,
    /// Delay before the first retry of an empty scan.
    pub retry_delay_ms: u64,
    /// Multiplier applied to the retry delay for each further attempt.
    pub backoff_factor: u32,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            settle_delay_ms: 500,
            retry_delay_ms: 1000,
            backoff_factor: 2,
            max_retries: 1,
        }
    }
}

impl RetryPolicy {
    /// Delay for retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1);
        let factor = u64::from(self.backoff_factor.max(1)).saturating_pow(exp);
        self.retry_delay_ms.saturating_mul(factor)
    }

    fn trigger_delay(&self, trigger: Trigger) -> u64 {
        match trigger {
            Trigger::PageLoad => self.initial_delay_ms,
            Trigger::Mutation | Trigger::RulesUpdated | Trigger::Retry => self.settle_delay_ms,
        }
    }
}

/// Permission to run one pass. Hand it back via [`ChangeWatcher::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTicket {
    generation: u64,
    attempt: u32,
    trigger: Trigger,
}

impl PassTicket {
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// 0 for the first pass, n for the n-th retry.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// What happened after a pass completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Candidates were found and decisions applied.
    Applied,
    /// Nothing found; another pass is scheduled.
    Retrying { due_ms: u64 },
    /// Nothing found and retries are exhausted.
    GaveUp,
    /// A newer trigger arrived while this pass was running.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Pending { due_ms: u64, ticket: PassTicket },
    Running(PassTicket),
}

/// Scheduling state machine for scan passes.
#[derive(Debug, Clone)]
pub struct ChangeWatcher {
    policy: RetryPolicy,
    generation: u64,
    state: State,
}

impl ChangeWatcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            generation: 0,
            state: State::Idle,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Schedule a fresh pass, replacing anything pending.
    pub fn schedule(&mut self, now_ms: u64, trigger: Trigger) -> u64 {
        self.generation += 1;
        let due_ms = now_ms.saturating_add(self.policy.trigger_delay(trigger));
        self.state = State::Pending {
            due_ms,
            ticket: PassTicket {
                generation: self.generation,
                attempt: 0,
                trigger,
            },
        };
        log::debug!("Scheduled pass ({:?}) at {}ms", trigger, due_ms);
        due_ms
    }

    /// Drop any pending pass or retry.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.state = State::Idle;
    }

    /// When the host should call [`ChangeWatcher::take_due`] next.
    pub fn next_deadline(&self) -> Option<u64> {
        match self.state {
            State::Pending { due_ms, .. } => Some(due_ms),
            State::Idle | State::Running(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    /// Claim the pending pass if its deadline has passed.
    pub fn take_due(&mut self, now_ms: u64) -> Option<PassTicket> {
        match self.state {
            State::Pending { due_ms, ticket } if now_ms >= due_ms => {
                self.state = State::Running(ticket);
                Some(ticket)
            }
            _ => None,
        }
    }

    /// Report how many candidates the pass found.
    pub fn complete(&mut self, ticket: PassTicket, now_ms: u64, candidates_found: usize) -> PassOutcome {
        if ticket.generation != self.generation {
            return PassOutcome::Superseded;
        }

        if candidates_found > 0 {
            self.state = State::Idle;
            return PassOutcome::Applied;
        }

        if ticket.attempt >= self.policy.max_retries {
            log::debug!("No market cards found after {} retries, giving up", ticket.attempt);
            self.state = State::Idle;
            return PassOutcome::GaveUp;
        }

        let attempt = ticket.attempt + 1;
        let delay = self.policy.retry_delay(attempt);
        let due_ms = now_ms.saturating_add(delay);
        log::debug!("No market cards found, trying again in {}ms", delay);
        self.state = State::Pending {
            due_ms,
            ticket: PassTicket {
                generation: ticket.generation,
                attempt,
                trigger: Trigger::Retry,
            },
        };
        PassOutcome::Retrying { due_ms }
    }

    /// Finish a pass without retry semantics (e.g. a restore while disabled).
    pub fn settle(&mut self, ticket: PassTicket) {
        if ticket.generation == self.generation {
            self.state = State::Idle;
        }
    }
}

impl Default for ChangeWatcher {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

// =============================================================================
// Insertion Qualification
// =============================================================================

/// Summary of one node added to the document, as reported by the host's
/// change feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertedNode {
    /// false for text and comment nodes
    pub is_element: bool,
    pub classes: Vec<String>,
    /// true if a candidate selector matches somewhere inside the node
    pub contains_candidate: bool,
}

impl InsertedNode {
    pub fn element<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_element: true,
            classes: classes.into_iter().map(Into::into).collect(),
            contains_candidate: false,
        }
    }

    pub fn with_candidate_inside(mut self) -> Self {
        self.contains_candidate = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_and_take() {
        let mut watcher = ChangeWatcher::default();
        let due = watcher.schedule(0, Trigger::PageLoad);
        assert_eq!(due, 1000);
        assert_eq!(watcher.next_deadline(), Some(1000));
        assert!(watcher.take_due(999).is_none());

        let ticket = watcher.take_due(1000).unwrap();
        assert_eq!(ticket.trigger(), Trigger::PageLoad);
        assert_eq!(watcher.next_deadline(), None);
        assert_eq!(watcher.complete(ticket, 1000, 12), PassOutcome::Applied);
        assert!(!watcher.is_pending());
    }

    #[test]
    fn test_empty_scan_retries_once() {
        let mut watcher = ChangeWatcher::default();
        watcher.schedule(0, Trigger::Mutation);
        let ticket = watcher.take_due(500).unwrap();
        assert_eq!(watcher.complete(ticket, 500, 0), PassOutcome::Retrying { due_ms: 1500 });

        let retry = watcher.take_due(1500).unwrap();
        assert_eq!(retry.trigger(), Trigger::Retry);
        assert_eq!(retry.attempt(), 1);
        assert_eq!(watcher.complete(retry, 1500, 0), PassOutcome::GaveUp);
        assert_eq!(watcher.next_deadline(), None);
    }

    #[test]
    fn test_backoff_grows() {
        let policy = RetryPolicy {
            max_retries: 3,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.retry_delay(1), 1000);
        assert_eq!(policy.retry_delay(2), 2000);
        assert_eq!(policy.retry_delay(3), 4000);

        let mut watcher = ChangeWatcher::new(policy);
        watcher.schedule(0, Trigger::RulesUpdated);
        let mut now = 500;
        let mut outcomes = Vec::new();
        while let Some(ticket) = watcher.take_due(now) {
            let outcome = watcher.complete(ticket, now, 0);
            outcomes.push(outcome);
            match outcome {
                PassOutcome::Retrying { due_ms } => now = due_ms,
                _ => break,
            }
        }
        assert_eq!(
            outcomes,
            vec![
                PassOutcome::Retrying { due_ms: 1500 },
                PassOutcome::Retrying { due_ms: 3500 },
                PassOutcome::Retrying { due_ms: 7500 },
                PassOutcome::GaveUp,
            ]
        );
    }

    #[test]
    fn test_new_trigger_supersedes_retry() {
        let mut watcher = ChangeWatcher::default();
        watcher.schedule(0, Trigger::PageLoad);
        let ticket = watcher.take_due(1000).unwrap();
        watcher.complete(ticket, 1000, 0);
        assert_eq!(watcher.next_deadline(), Some(2000));

        watcher.schedule(1200, Trigger::Mutation);
        assert_eq!(watcher.next_deadline(), Some(1700));
        let ticket = watcher.take_due(1700).unwrap();
        assert_eq!(ticket.trigger(), Trigger::Mutation);
        assert_eq!(ticket.attempt(), 0);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut watcher = ChangeWatcher::default();
        watcher.schedule(0, Trigger::Mutation);
        let stale = watcher.take_due(500).unwrap();
        watcher.schedule(600, Trigger::RulesUpdated);
        assert_eq!(watcher.complete(stale, 700, 0), PassOutcome::Superseded);
        assert_eq!(watcher.next_deadline(), Some(1100));
    }

    #[test]
    fn test_cancel() {
        let mut watcher = ChangeWatcher::default();
        watcher.schedule(0, Trigger::Mutation);
        watcher.cancel();
        assert!(watcher.take_due(10_000).is_none());
        assert_eq!(watcher.next_deadline(), None);
    }

    #[test]
    fn test_settle_goes_idle() {
        let mut watcher = ChangeWatcher::default();
        watcher.schedule(0, Trigger::Mutation);
        let ticket = watcher.take_due(500).unwrap();
        watcher.settle(ticket);
        assert!(!watcher.is_pending());
        assert!(watcher.take_due(10_000).is_none());
    }
}
