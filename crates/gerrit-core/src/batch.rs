//! Sequential batch operations over a resolved set of changes.
//!
//! A batch resolves its target changes with a single query, then runs a
//! multi-step action on each change strictly in query order. A failing step
//! aborts the remaining steps of that change only: the failure is folded
//! into an [`ItemOutcome::Failed`] line and the loop moves on. Nothing that
//! already succeeded is rolled back.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::provider::ReviewProvider;
use crate::sync::SyncTool;
use crate::types::{open_topic_query, Change, ChangeSelector, ReviewInput, SubmitInput};

/// Wait between voting and submitting.
///
/// Gerrit gives no signal that a vote has been applied to submit
/// requirements, so this is a heuristic pause rather than a guarantee.
pub const DEFAULT_VOTE_DELAY: Duration = Duration::from_millis(1000);

/// Message attached to every batch approval.
pub const DEFAULT_AUDIT_MESSAGE: &str = "Approved and submitted in batch via gerrit-mcp";

pub const DEFAULT_CODE_REVIEW_VOTE: i32 = 2;
pub const DEFAULT_VERIFIED_VOTE: i32 = 1;

/// Result of processing one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded { summary: String },
    Failed { number: u64, detail: String },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }

    /// Report line for this outcome.
    pub fn line(&self) -> String {
        match self {
            ItemOutcome::Succeeded { summary } => format!("✓ {}", summary),
            ItemOutcome::Failed { number, detail } => format!("✗ Failed {}: {}", number, detail),
        }
    }
}

/// Ordered outcome report of a batch invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchReport {
    /// The selector resolved to no changes; nothing was mutated.
    NothingFound(String),
    /// One outcome per resolved change, in resolution order.
    Processed(Vec<ItemOutcome>),
}

impl BatchReport {
    pub fn outcomes(&self) -> &[ItemOutcome] {
        match self {
            BatchReport::NothingFound(_) => &[],
            BatchReport::Processed(outcomes) => outcomes,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes().iter().filter(|o| !o.is_success()).count()
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            BatchReport::NothingFound(notice) => vec![notice.clone()],
            BatchReport::Processed(outcomes) => outcomes.iter().map(ItemOutcome::line).collect(),
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

/// Run `action` on each change in order, isolating failures per change.
///
/// The action returns the success summary for its change. Each change
/// contributes exactly one outcome, in input order.
pub async fn run_sequential<'a, F, Fut>(changes: &'a [Change], mut action: F) -> Vec<ItemOutcome>
where
    F: FnMut(&'a Change) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut outcomes = Vec::with_capacity(changes.len());

    for change in changes {
        let outcome = match action(change).await {
            Ok(summary) => ItemOutcome::Succeeded { summary },
            Err(e) => {
                warn!(change = change.number, error = %e, "Batch item failed");
                ItemOutcome::Failed {
                    number: change.number,
                    detail: e.detail(),
                }
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}

// =============================================================================
// Vote-then-submit
// =============================================================================

/// Settings for the vote-then-submit action.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteSubmitSettings {
    pub message: String,
    pub code_review: i32,
    pub verified: i32,
    pub delay: Duration,
}

impl Default for VoteSubmitSettings {
    fn default() -> Self {
        Self {
            message: DEFAULT_AUDIT_MESSAGE.to_string(),
            code_review: DEFAULT_CODE_REVIEW_VOTE,
            verified: DEFAULT_VERIFIED_VOTE,
            delay: DEFAULT_VOTE_DELAY,
        }
    }
}

/// Progress of a single change through vote-then-submit.
///
/// `Pending -> Voted -> Submitted`, with `Failed` reachable from either
/// non-terminal stage. There are no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteSubmitStage {
    Pending,
    Voted,
    Submitted,
    Failed,
}

impl VoteSubmitStage {
    /// Stage reached once the step run from `self` completes.
    pub fn transition(self, succeeded: bool) -> Self {
        match (self, succeeded) {
            (Self::Pending, true) => Self::Voted,
            (Self::Voted, true) => Self::Submitted,
            (Self::Pending | Self::Voted, false) => Self::Failed,
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Failed)
    }
}

/// Vote on the current revision, wait, then submit.
pub async fn vote_and_submit(
    provider: &dyn ReviewProvider,
    change: &Change,
    settings: &VoteSubmitSettings,
) -> Result<String> {
    let key = change.number.to_string();
    let revision = change.current_revision.as_deref().unwrap_or("current");
    let review = ReviewInput::approval(&settings.message, settings.code_review, settings.verified);

    let mut stage = VoteSubmitStage::Pending;
    while !stage.is_terminal() {
        let step = match stage {
            VoteSubmitStage::Pending => provider.post_review(&key, revision, &review).await.map(drop),
            VoteSubmitStage::Voted => {
                tokio::time::sleep(settings.delay).await;
                provider
                    .submit_change(&key, &SubmitInput::default())
                    .await
                    .map(drop)
            }
            VoteSubmitStage::Submitted | VoteSubmitStage::Failed => Ok(()),
        };

        let next = stage.transition(step.is_ok());
        debug!(change = change.number, from = ?stage, to = ?next, "Vote-then-submit step");
        step?;
        stage = next;
    }

    Ok(format!("Processed {}: {}", change.number, change.subject))
}

/// Approve and submit every open change of `topic`.
pub async fn review_submit_topic(
    provider: &dyn ReviewProvider,
    topic: &str,
    settings: &VoteSubmitSettings,
) -> Result<BatchReport> {
    let changes = provider.query_changes(&open_topic_query(topic), None).await?;

    if changes.is_empty() {
        return Ok(BatchReport::NothingFound(format!(
            "No open changes found for topic '{}'",
            topic
        )));
    }

    info!(topic = topic, count = changes.len(), "Batch review and submit");

    let outcomes = run_sequential(&changes, |change| {
        vote_and_submit(provider, change, settings)
    })
    .await;

    Ok(BatchReport::Processed(outcomes))
}

// =============================================================================
// Download-and-apply
// =============================================================================

/// Resolve the changes a selector refers to.
pub async fn resolve_changes(
    provider: &dyn ReviewProvider,
    selector: &ChangeSelector,
) -> Result<Vec<Change>> {
    match selector {
        ChangeSelector::Topic(topic) => provider.query_changes(&open_topic_query(topic), None).await,
        ChangeSelector::Change(change_id) => Ok(vec![provider.get_change(change_id).await?]),
    }
}

/// Download the current patchset of a change into the local workspace.
pub async fn download_change(sync_tool: &dyn SyncTool, change: &Change) -> Result<String> {
    let change_ref = change.download_ref()?;
    sync_tool.download(&change.project, &change_ref).await?;
    Ok(format!(
        "Synced {} ({}): {}",
        change_ref, change.project, change.subject
    ))
}

/// Apply every change matched by `selector` to the local workspace.
pub async fn sync_to_local(
    provider: &dyn ReviewProvider,
    sync_tool: &dyn SyncTool,
    selector: &ChangeSelector,
) -> Result<BatchReport> {
    let changes = resolve_changes(provider, selector).await?;

    if changes.is_empty() {
        return Ok(BatchReport::NothingFound(match selector {
            ChangeSelector::Topic(topic) => format!("No open changes found for topic '{}'", topic),
            ChangeSelector::Change(change_id) => format!("No change found for '{}'", change_id),
        }));
    }

    info!(count = changes.len(), "Syncing changes to local workspace");

    let outcomes = run_sequential(&changes, |change| download_change(sync_tool, change)).await;

    Ok(BatchReport::Processed(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::provider::MockReviewProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn change(number: u64, subject: &str) -> Change {
        Change {
            id: format!("platform%2Fbuild~main~I{:040}", number),
            number,
            project: "platform/build".to_string(),
            branch: "main".to_string(),
            topic: Some("release".to_string()),
            subject: subject.to_string(),
            status: "NEW".to_string(),
            current_revision: Some(format!("{:040x}", number)),
            current_patchset: Some(3),
            ..Default::default()
        }
    }

    fn instant_settings() -> VoteSubmitSettings {
        VoteSubmitSettings {
            delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn submitted(number: u64) -> Change {
        Change {
            number,
            status: "MERGED".to_string(),
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct RecordingSyncTool {
        calls: Mutex<Vec<(String, String)>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl SyncTool for RecordingSyncTool {
        async fn download(&self, project: &str, change_ref: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((project.to_string(), change_ref.to_string()));
            if self.fail_on.as_deref() == Some(change_ref) {
                return Err(Error::Sync("repo exited with exit status: 1".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_vote_submit_stage_transitions() {
        use VoteSubmitStage::*;

        assert_eq!(Pending.transition(true), Voted);
        assert_eq!(Voted.transition(true), Submitted);
        assert_eq!(Pending.transition(false), Failed);
        assert_eq!(Voted.transition(false), Failed);
        assert_eq!(Submitted.transition(false), Submitted);
        assert_eq!(Failed.transition(true), Failed);

        assert!(!Pending.is_terminal());
        assert!(!Voted.is_terminal());
        assert!(Submitted.is_terminal());
        assert!(Failed.is_terminal());
    }

    #[test]
    fn test_outcome_lines() {
        let ok = ItemOutcome::Succeeded {
            summary: "Processed 1: Fix boot".to_string(),
        };
        let failed = ItemOutcome::Failed {
            number: 2,
            detail: "merge conflict".to_string(),
        };
        assert_eq!(ok.line(), "✓ Processed 1: Fix boot");
        assert_eq!(failed.line(), "✗ Failed 2: merge conflict");
    }

    #[test]
    fn test_report_display() {
        let report = BatchReport::Processed(vec![
            ItemOutcome::Succeeded {
                summary: "Processed 1: A".to_string(),
            },
            ItemOutcome::Failed {
                number: 2,
                detail: "boom".to_string(),
            },
        ]);
        assert_eq!(report.to_string(), "✓ Processed 1: A\n✗ Failed 2: boom");
        assert_eq!(report.failed_count(), 1);

        let empty = BatchReport::NothingFound("No open changes found".to_string());
        assert_eq!(empty.lines(), vec!["No open changes found".to_string()]);
        assert!(empty.outcomes().is_empty());
    }

    #[tokio::test]
    async fn test_run_sequential_keeps_order_and_isolates() {
        let changes = vec![change(1, "a"), change(2, "b"), change(3, "c")];

        let outcomes = run_sequential(&changes, |c| async move {
            if c.number == 2 {
                Err(Error::from_status(409, "nope"))
            } else {
                Ok(format!("Processed {}: {}", c.number, c.subject))
            }
        })
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].line(), "✓ Processed 1: a");
        assert_eq!(outcomes[1].line(), "✗ Failed 2: nope");
        assert_eq!(outcomes[2].line(), "✓ Processed 3: c");
    }

    #[tokio::test]
    async fn test_topic_all_succeed() {
        let mut provider = MockReviewProvider::new();
        provider
            .expect_query_changes()
            .withf(|query, limit| query == "topic:\"release\" status:open" && limit.is_none())
            .times(1)
            .returning(|_, _| Ok(vec![change(101, "Fix boot"), change(102, "Bump version")]));
        provider
            .expect_post_review()
            .withf(|_, _, input| {
                input.labels.get("Code-Review") == Some(&2)
                    && input.labels.get("Verified") == Some(&1)
                    && input.message.as_deref() == Some(DEFAULT_AUDIT_MESSAGE)
            })
            .times(2)
            .returning(|_, _, _| Ok(serde_json::json!({"labels": {"Code-Review": 2}})));
        provider
            .expect_submit_change()
            .withf(|_, input| input.wait_for_merge)
            .times(2)
            .returning(|id, _| Ok(submitted(id.parse().unwrap())));

        let report = review_submit_topic(&provider, "release", &instant_settings())
            .await
            .unwrap();

        assert_eq!(
            report.lines(),
            vec![
                "✓ Processed 101: Fix boot".to_string(),
                "✓ Processed 102: Bump version".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_topic_empty_makes_no_mutations() {
        let mut provider = MockReviewProvider::new();
        provider
            .expect_query_changes()
            .times(1)
            .returning(|_, _| Ok(vec![]));
        provider.expect_post_review().times(0);
        provider.expect_submit_change().times(0);

        let report = review_submit_topic(&provider, "ghost", &instant_settings())
            .await
            .unwrap();

        assert_eq!(
            report.lines(),
            vec!["No open changes found for topic 'ghost'".to_string()]
        );
    }

    #[tokio::test]
    async fn test_vote_failure_skips_submit_for_that_change() {
        let mut provider = MockReviewProvider::new();
        provider
            .expect_query_changes()
            .returning(|_, _| Ok(vec![change(1, "a"), change(2, "b"), change(3, "c")]));
        provider
            .expect_post_review()
            .times(3)
            .returning(|id, _, _| {
                if id == "2" {
                    Err(Error::from_status(403, "not permitted: label Code-Review"))
                } else {
                    Ok(serde_json::json!({}))
                }
            });
        // Any submit for change 2 has no matching expectation and panics.
        provider
            .expect_submit_change()
            .withf(|id, _| id != "2")
            .times(2)
            .returning(|id, _| Ok(submitted(id.parse().unwrap())));

        let report = review_submit_topic(&provider, "release", &instant_settings())
            .await
            .unwrap();

        assert_eq!(
            report.lines(),
            vec![
                "✓ Processed 1: a".to_string(),
                "✗ Failed 2: not permitted: label Code-Review".to_string(),
                "✓ Processed 3: c".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_order_preserved_for_every_failure_pattern() {
        const N: u64 = 4;

        for mask in 0u32..(1 << N) {
            let fails = move |number: u64| mask & (1 << (number - 1)) != 0;

            let mut provider = MockReviewProvider::new();
            provider
                .expect_query_changes()
                .returning(|_, _| Ok((1..=N).map(|n| change(n, &format!("change {}", n))).collect()));
            provider.expect_post_review().returning(|_, _, _| Ok(serde_json::json!({})));
            provider.expect_submit_change().returning(move |id, _| {
                let number: u64 = id.parse().unwrap();
                if fails(number) {
                    Err(Error::from_status(409, format!("conflict in {}", number)))
                } else {
                    Ok(submitted(number))
                }
            });

            let report = review_submit_topic(&provider, "release", &instant_settings())
                .await
                .unwrap();
            let lines = report.lines();

            assert_eq!(lines.len(), N as usize, "mask {:04b}", mask);
            for (i, line) in lines.iter().enumerate() {
                let number = i as u64 + 1;
                let expected = if fails(number) {
                    format!("✗ Failed {}: conflict in {}", number, number)
                } else {
                    format!("✓ Processed {}: change {}", number, number)
                };
                assert_eq!(line, &expected, "mask {:04b}", mask);
            }
        }
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let mut provider = MockReviewProvider::new();
        provider
            .expect_query_changes()
            .returning(|_, _| Err(Error::Http("connection refused".to_string())));
        provider.expect_post_review().times(0);

        let err = review_submit_topic(&provider, "release", &instant_settings())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_vote_and_submit() {
        let voted_at = std::sync::Arc::new(Mutex::new(None));
        let submitted_at = std::sync::Arc::new(Mutex::new(None));

        let mut provider = MockReviewProvider::new();
        let voted = voted_at.clone();
        provider.expect_post_review().returning(move |_, _, _| {
            *voted.lock().unwrap() = Some(tokio::time::Instant::now());
            Ok(serde_json::json!({}))
        });
        let submitted_clone = submitted_at.clone();
        provider.expect_submit_change().returning(move |id, _| {
            *submitted_clone.lock().unwrap() = Some(tokio::time::Instant::now());
            Ok(submitted(id.parse().unwrap()))
        });

        let settings = VoteSubmitSettings::default();
        vote_and_submit(&provider, &change(5, "e"), &settings)
            .await
            .unwrap();

        let voted = voted_at.lock().unwrap().unwrap();
        let submitted = submitted_at.lock().unwrap().unwrap();
        assert!(submitted - voted >= DEFAULT_VOTE_DELAY);
    }

    #[tokio::test]
    async fn test_vote_uses_current_revision() {
        let mut provider = MockReviewProvider::new();
        provider
            .expect_post_review()
            .withf(|id, revision, _| id == "9" && revision == format!("{:040x}", 9))
            .times(1)
            .returning(|_, _, _| Ok(serde_json::json!({})));
        provider
            .expect_submit_change()
            .returning(|id, _| Ok(submitted(id.parse().unwrap())));

        vote_and_submit(&provider, &change(9, "i"), &instant_settings())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sync_topic_downloads_in_order() {
        let mut provider = MockReviewProvider::new();
        provider
            .expect_query_changes()
            .returning(|_, _| Ok(vec![change(11, "first"), change(12, "second")]));
        let tool = RecordingSyncTool::default();

        let report = sync_to_local(&provider, &tool, &ChangeSelector::Topic("release".into()))
            .await
            .unwrap();

        assert_eq!(
            report.lines(),
            vec![
                "✓ Synced 11/3 (platform/build): first".to_string(),
                "✓ Synced 12/3 (platform/build): second".to_string(),
            ]
        );
        assert_eq!(
            *tool.calls.lock().unwrap(),
            vec![
                ("platform/build".to_string(), "11/3".to_string()),
                ("platform/build".to_string(), "12/3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_sync_child_failure_is_isolated() {
        let mut provider = MockReviewProvider::new();
        provider.expect_query_changes().returning(|_, _| {
            let mut missing = change(22, "no revision");
            missing.current_patchset = None;
            Ok(vec![change(21, "first"), missing, change(23, "third")])
        });
        let tool = RecordingSyncTool {
            fail_on: Some("21/3".to_string()),
            ..Default::default()
        };

        let report = sync_to_local(&provider, &tool, &ChangeSelector::Topic("release".into()))
            .await
            .unwrap();
        let lines = report.lines();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "✗ Failed 21: Sync error: repo exited with exit status: 1");
        assert!(lines[1].starts_with("✗ Failed 22: "));
        assert!(lines[1].contains("no current revision"));
        assert_eq!(lines[2], "✓ Synced 23/3 (platform/build): third");
        // The change without a revision never reaches the tool.
        assert_eq!(tool.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_single_change() {
        let mut provider = MockReviewProvider::new();
        provider
            .expect_get_change()
            .withf(|id| id == "31")
            .times(1)
            .returning(|_| Ok(change(31, "single")));
        provider.expect_query_changes().times(0);
        let tool = RecordingSyncTool::default();

        let report = sync_to_local(&provider, &tool, &ChangeSelector::Change("31".into()))
            .await
            .unwrap();

        assert_eq!(report.to_string(), "✓ Synced 31/3 (platform/build): single");
    }

    #[tokio::test]
    async fn test_sync_empty_topic() {
        let mut provider = MockReviewProvider::new();
        provider.expect_query_changes().returning(|_, _| Ok(vec![]));
        let tool = RecordingSyncTool::default();

        let report = sync_to_local(&provider, &tool, &ChangeSelector::Topic("none".into()))
            .await
            .unwrap();

        assert_eq!(report.to_string(), "No open changes found for topic 'none'");
        assert!(tool.calls.lock().unwrap().is_empty());
    }
}
