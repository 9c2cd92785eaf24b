use chrono::{DateTime, Local, NaiveDate, Utc};
use rowbase::domain::ActivityEvent;
use rowbase::{RowChange, RowbaseClient, RowbaseFetchError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const PAGE_SIZE: usize = 20;

/// Feed events under one local-calendar-day header.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub header: String,
    pub events: Vec<ActivityEvent>,
}

/// The locally displayed activity list: newest first, paginated, with
/// optimistic read/delete reconciliation against the backend.
pub struct ActivityFeed {
    db: RowbaseClient,
    events: Vec<ActivityEvent>,
    reached_end: bool,
    unread_tx: watch::Sender<usize>,
}

impl ActivityFeed {
    pub fn new(db: RowbaseClient) -> Self {
        let (unread_tx, _) = watch::channel(0);
        Self {
            db,
            events: Vec::new(),
            reached_end: false,
            unread_tx,
        }
    }

    pub fn events(&self) -> &[ActivityEvent] {
        &self.events
    }

    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    pub fn unread_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_unread()).count()
    }

    /// Badge listeners subscribe here; the count is re-broadcast once per
    /// settle.
    pub fn subscribe_unread(&self) -> watch::Receiver<usize> {
        self.unread_tx.subscribe()
    }

    /// Fetch the next page and append it. Returns how many new events were
    /// added.
    pub async fn fetch_next_page(&mut self) -> Result<usize, RowbaseFetchError> {
        if self.reached_end {
            return Ok(0);
        }
        let page = self.db.fetch_activity_page(PAGE_SIZE, self.events.len()).await?;
        let added = self.ingest_page(page);
        self.settle();
        Ok(added)
    }

    /// Drop everything and reload from the top. This is also the only path
    /// that heals divergence left behind by the optimistic mutations below.
    pub async fn refresh(&mut self) -> Result<(), RowbaseFetchError> {
        self.events.clear();
        self.reached_end = false;
        self.fetch_next_page().await?;
        Ok(())
    }

    /// Append a server page, deduplicated by id. A short page marks the end
    /// of the data.
    fn ingest_page(&mut self, page: Vec<ActivityEvent>) -> usize {
        if page.len() < PAGE_SIZE {
            self.reached_end = true;
        }
        let mut added = 0;
        for event in page {
            if !self.events.iter().any(|existing| existing.id == event.id) {
                self.events.push(event);
                added += 1;
            }
        }
        added
    }

    /// Mark every visible unread event read. The server call is issued in
    /// the background while the local timestamps flip immediately, so the
    /// list reads as "seen" the moment it is viewed. If the server call
    /// fails after the local flip there is no retry; the next full refresh
    /// re-fetches server truth. The returned handle lets one-shot surfaces
    /// drain the server call before exiting; long-lived surfaces drop it.
    pub fn mark_all_read(&mut self) -> Option<JoinHandle<()>> {
        if self.events.iter().all(|e| !e.is_unread()) {
            return None;
        }
        let db = self.db.clone();
        let task = tokio::spawn(async move {
            if let Err(err) = db.mark_all_activity_read().await {
                tracing::warn!("server mark-read failed after local flip: {err}");
            }
        });
        self.apply_mark_all_read(Utc::now());
        self.settle();
        Some(task)
    }

    /// Local half of the optimistic mark-read.
    fn apply_mark_all_read(&mut self, now: DateTime<Utc>) {
        for event in &mut self.events {
            if event.read_at.is_none() {
                event.read_at = Some(now);
            }
        }
    }

    /// Remove an event locally and fire a best-effort server delete. A
    /// failed server delete leaves the row on the backend until the next
    /// refresh; the local list has already moved on.
    pub fn delete(&mut self, id: Uuid) -> Option<JoinHandle<()>> {
        if !self.apply_remove(id) {
            return None;
        }
        let db = self.db.clone();
        let task = tokio::spawn(async move {
            if let Err(err) = db.delete_activity(id).await {
                tracing::debug!("server delete of activity {id} failed: {err}");
            }
        });
        self.settle();
        Some(task)
    }

    fn apply_remove(&mut self, id: Uuid) -> bool {
        let before = self.events.len();
        self.events.retain(|event| event.id != id);
        self.events.len() != before
    }

    /// Recompute the unread count and broadcast it to badge listeners.
    fn settle(&self) {
        self.unread_tx.send_replace(self.unread_count());
    }

    /// Realtime hook: a pushed change on the activity table reloads the list
    /// and badge without polling. Only surfaces with a live push channel
    /// call this; the CLI has none.
    #[allow(dead_code)]
    pub async fn handle_change(&mut self, change: &RowChange) -> Result<(), RowbaseFetchError> {
        if !change.concerns_activity() {
            return Ok(());
        }
        self.refresh().await
    }

    pub fn day_groups(&self) -> Vec<DayGroup> {
        group_by_day(&self.events)
    }
}

/// Group events (already newest-first) by the local calendar day of their
/// creation timestamp.
pub fn group_by_day(events: &[ActivityEvent]) -> Vec<DayGroup> {
    let today = Local::now().date_naive();
    let mut groups: Vec<DayGroup> = Vec::new();
    let mut current_day: Option<NaiveDate> = None;

    for event in events {
        let day = event.created_at.with_timezone(&Local).date_naive();
        if current_day != Some(day) {
            groups.push(DayGroup {
                header: day_header(day, today),
                events: Vec::new(),
            });
            current_day = Some(day);
        }
        if let Some(group) = groups.last_mut() {
            group.events.push(event.clone());
        }
    }

    groups
}

fn day_header(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if Some(day) == today.pred_opt() {
        "Yesterday".to_string()
    } else {
        day.format("%b %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rowbase::domain::ActivityKind;
    use rowbase::RowbaseUrl;

    fn event(created_at: DateTime<Utc>, read: bool) -> ActivityEvent {
        ActivityEvent {
            id: Uuid::new_v4(),
            invoice_id: None,
            kind: ActivityKind::Opened,
            created_at,
            read_at: read.then_some(created_at),
            invoice_number: Some("INV-0001".to_string()),
            client_join: None,
            client_name: Some("Acme Inc".to_string()),
        }
    }

    fn unreachable_feed() -> ActivityFeed {
        // Port 9 (discard) is never listening; server calls fail fast.
        let db = RowbaseClient::new(RowbaseUrl::new("http://127.0.0.1:9"), "anon");
        ActivityFeed::new(db)
    }

    #[test]
    fn full_page_leaves_more_to_fetch() {
        let mut feed = unreachable_feed();
        let page: Vec<_> = (0..PAGE_SIZE).map(|_| event(Utc::now(), false)).collect();
        assert_eq!(feed.ingest_page(page), PAGE_SIZE);
        assert!(!feed.reached_end());
    }

    #[test]
    fn short_page_marks_the_end() {
        let mut feed = unreachable_feed();
        let page: Vec<_> = (0..7).map(|_| event(Utc::now(), false)).collect();
        feed.ingest_page(page);
        assert!(feed.reached_end());
    }

    #[test]
    fn overlapping_pages_deduplicate_by_id() {
        let mut feed = unreachable_feed();
        let shared = event(Utc::now(), false);
        feed.ingest_page(vec![shared.clone()]);
        assert_eq!(feed.ingest_page(vec![shared]), 0);
        assert_eq!(feed.events().len(), 1);
    }

    #[tokio::test]
    async fn mark_all_read_flips_locally_even_when_the_server_is_down() {
        let mut feed = unreachable_feed();
        feed.ingest_page(vec![
            event(Utc::now(), false),
            event(Utc::now(), true),
            event(Utc::now(), false),
        ]);
        assert_eq!(feed.unread_count(), 2);

        feed.mark_all_read();
        assert_eq!(feed.unread_count(), 0);
        assert!(feed.events().iter().all(|e| e.read_at.is_some()));
    }

    #[tokio::test]
    async fn mark_all_read_broadcasts_the_new_count_once() {
        let mut feed = unreachable_feed();
        feed.ingest_page(vec![event(Utc::now(), false)]);
        let mut rx = feed.subscribe_unread();

        feed.mark_all_read();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 0);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn delete_removes_locally_even_when_the_server_delete_fails() {
        let mut feed = unreachable_feed();
        let doomed = event(Utc::now(), false);
        let doomed_id = doomed.id;
        feed.ingest_page(vec![doomed, event(Utc::now(), false)]);

        feed.delete(doomed_id);
        assert_eq!(feed.events().len(), 1);
        assert!(feed.events().iter().all(|e| e.id != doomed_id));
    }

    #[tokio::test]
    async fn deleting_an_unknown_id_is_a_no_op() {
        let mut feed = unreachable_feed();
        feed.ingest_page(vec![event(Utc::now(), false)]);
        feed.delete(Uuid::new_v4());
        assert_eq!(feed.events().len(), 1);
    }

    /// Local noon today: immune to the test crossing midnight mid-run.
    fn local_noon() -> DateTime<Utc> {
        let noon = Local::now()
            .date_naive()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap();
        noon.with_timezone(&Utc)
    }

    #[tokio::test]
    async fn changes_to_other_tables_do_not_trigger_a_refresh() {
        let mut feed = unreachable_feed();
        feed.ingest_page(vec![event(Utc::now(), false)]);
        let change: RowChange =
            serde_json::from_str(r#"{"table": "invoices", "eventType": "UPDATE"}"#).unwrap();
        feed.handle_change(&change).await.unwrap();
        assert_eq!(feed.events().len(), 1);
    }

    #[test]
    fn same_local_day_shares_one_header() {
        let noon = local_noon();
        let groups = group_by_day(&[
            event(noon, false),
            event(noon - Duration::minutes(5), false),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].header, "Today");
        assert_eq!(groups[0].events.len(), 2);
    }

    #[test]
    fn yesterday_gets_its_own_header() {
        let noon = local_noon();
        let groups = group_by_day(&[event(noon, false), event(noon - Duration::days(1), false)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].header, "Today");
        assert_eq!(groups[1].header, "Yesterday");
    }

    #[test]
    fn older_days_use_the_short_date() {
        let old = Utc::now() - Duration::days(30);
        let groups = group_by_day(&[event(old, false)]);
        let expected = old.with_timezone(&Local).format("%b %-d, %Y").to_string();
        assert_eq!(groups[0].header, expected);
    }
}
