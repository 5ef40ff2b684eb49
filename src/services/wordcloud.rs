//! Comment word cloud
//!
//! Recent approved comments are segmented with part-of-speech tagging and
//! reduced to the most frequent nouns and adjective/verb + noun pairs. The
//! broadcaster recomputes the cloud after comment changes and publishes each
//! snapshot on a watch channel, so slow readers only ever see the latest one.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use chrono::Utc;
use jieba_rs::Jieba;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};
use crate::config::WordCloudConfig;
use crate::database::DatabaseService;
use crate::services::redis::RedisService;
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::log_degraded;

const STOP_WORDS: &[&str] = &[
    "的", "是", "在", "我", "有", "就", "这", "那", "们", "和", "与", "及", "也", "还", "都", "只",
    "个", "了", "吗", "呢", "吧", "啊", "哦", "之", "于", "为", "你", "你们", "我们", "运动", "赛事",
];

/// One entry of the cloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordWeight {
    pub text: String,
    pub weight: usize,
}

pub type Snapshot = Arc<Vec<WordWeight>>;

/// Message pushed to dashboard sockets
#[derive(Debug, Clone, Serialize)]
pub struct WordCloudMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: &'a [WordWeight],
}

impl<'a> WordCloudMessage<'a> {
    pub fn update(payload: &'a [WordWeight]) -> Self {
        Self { kind: "wordcloud_update", payload }
    }
}

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

fn jieba() -> &'static Jieba {
    static JIEBA: OnceLock<Jieba> = OnceLock::new();
    JIEBA.get_or_init(Jieba::new)
}

/// Keep only CJK unified ideographs
pub fn clean_text(raw: &str) -> String {
    raw.chars().filter(|c| ('\u{4e00}'..='\u{9fa5}').contains(c)).collect()
}

/// Apply the selection rules to a tagged segmentation
pub fn select_tokens(segments: &[(&str, &str)]) -> Vec<String> {
    let stop = stop_words();
    let mut tokens = Vec::new();

    for (index, (word, flag)) in segments.iter().enumerate() {
        if word.chars().count() < 2 || stop.contains(word) {
            continue;
        }
        if flag.starts_with('n') {
            tokens.push(word.to_string());
        }
        if flag.starts_with('a') || flag.starts_with('v') {
            if let Some((next, next_flag)) = segments.get(index + 1) {
                if next_flag.starts_with('n') && !stop.contains(next) {
                    tokens.push(format!("{}{}", word, next));
                }
            }
        }
    }
    tokens
}

/// Segment a comment and extract its cloud tokens
pub fn extract_tokens(text: &str) -> Vec<String> {
    let clean = clean_text(text);
    if clean.is_empty() {
        return Vec::new();
    }

    let tags = jieba().tag(&clean, true);
    let segments: Vec<(&str, &str)> = tags.iter().map(|t| (t.word, t.tag)).collect();
    select_tokens(&segments)
}

/// Most frequent tokens first; ties keep first-seen order
pub fn top_words<I>(tokens: I, max_words: usize) -> Vec<WordWeight>
where
    I: IntoIterator<Item = String>,
{
    let mut order: Vec<WordWeight> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for token in tokens {
        match index.get(&token) {
            Some(&i) => order[i].weight += 1,
            None => {
                index.insert(token.clone(), order.len());
                order.push(WordWeight { text: token, weight: 1 });
            }
        }
    }

    order.sort_by(|a, b| b.weight.cmp(&a.weight));
    order.truncate(max_words);
    order
}

/// Build the cloud from comment bodies, newest first
pub fn collect<S: AsRef<str>>(contents: &[S], max_words: usize) -> Vec<WordWeight> {
    top_words(contents.iter().flat_map(|c| extract_tokens(c.as_ref())), max_words)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Marked,
    Tick,
}

struct Shared {
    db: DatabaseService,
    redis: RedisService,
    config: WordCloudConfig,
    dirty: Notify,
    sender: watch::Sender<Snapshot>,
}

/// Recomputes the cloud on demand and fans snapshots out to subscribers
#[derive(Clone)]
pub struct WordCloudBroadcaster {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for WordCloudBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordCloudBroadcaster")
            .field("subscribers", &self.shared.sender.receiver_count())
            .finish_non_exhaustive()
    }
}

impl WordCloudBroadcaster {
    pub fn new(db: DatabaseService, redis: RedisService, config: WordCloudConfig) -> Self {
        let (sender, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            shared: Arc::new(Shared {
                db,
                redis,
                config,
                dirty: Notify::new(),
                sender,
            }),
        }
    }

    /// Request a recompute; repeated marks before the task wakes coalesce
    pub fn mark_dirty(&self) {
        self.shared.dirty.notify_one();
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.sender.receiver_count()
    }

    pub fn current(&self) -> Snapshot {
        self.shared.sender.borrow().clone()
    }

    /// Replace the current snapshot and wake every subscriber
    pub fn publish(&self, words: Vec<WordWeight>) -> Snapshot {
        let snapshot = Arc::new(words);
        self.shared.sender.send_replace(snapshot.clone());
        snapshot
    }

    /// Recompute from the database, publish and cache the result
    pub async fn refresh(&self) -> Result<Snapshot> {
        let config = &self.shared.config;
        let since = Utc::now() - chrono::Duration::days(config.window_days);
        let contents = self
            .shared
            .db
            .interactions
            .recent_approved_contents(since, config.max_comments)
            .await?;

        let max_words = config.max_words;
        let comments = contents.len();
        let words = tokio::task::spawn_blocking(move || collect(&contents, max_words))
            .await
            .map_err(|e| SportsHubError::ServiceUnavailable(format!("Word cloud task failed: {e}")))?;

        debug!(comments, words = words.len(), "Word cloud recomputed");
        let snapshot = self.publish(words);
        self.shared.redis.cache_wordcloud(snapshot.as_ref()).await;
        Ok(snapshot)
    }

    /// Seed the snapshot with a fresh recompute; the Redis copy is used only
    /// when the database cannot answer
    pub async fn warm(&self) {
        let Err(e) = self.refresh().await else {
            return;
        };
        log_degraded("wordcloud", &e.to_string(), Some("warm"));
        if let Some(cached) = self.shared.redis.cached_wordcloud::<Vec<WordWeight>>().await {
            self.publish(cached);
        }
    }

    /// Wait for the next reason to recompute. A mark is debounced so a burst
    /// of changes costs one recompute; the periodic tick is not.
    async fn next_trigger(&self, ticker: &mut Interval) -> Trigger {
        tokio::select! {
            _ = self.shared.dirty.notified() => {
                tokio::time::sleep(Duration::from_millis(self.shared.config.debounce_ms)).await;
                Trigger::Marked
            }
            _ = ticker.tick() => Trigger::Tick,
        }
    }

    /// Background task: recompute on marks and on the refresh interval
    pub fn start(&self) -> JoinHandle<()> {
        let broadcaster = self.clone();
        let period = Duration::from_secs(self.shared.config.refresh_secs.max(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                let trigger = broadcaster.next_trigger(&mut ticker).await;
                debug!(?trigger, "Word cloud recompute");
                if let Err(e) = broadcaster.refresh().await {
                    log_degraded("wordcloud", &e.to_string(), Some("refresh"));
                }
            }
        });

        info!(
            debounce_ms = self.shared.config.debounce_ms,
            refresh_secs = self.shared.config.refresh_secs,
            "Started word cloud broadcaster"
        );
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::database::create_lazy_pool;
    use crate::database::connection::DatabaseConfig;

    fn broadcaster() -> WordCloudBroadcaster {
        let settings = Settings::default();
        let config = DatabaseConfig {
            url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
            ..DatabaseConfig::default()
        };
        let db = DatabaseService::new(create_lazy_pool(&config).unwrap());
        let redis = RedisService::new(&settings.redis).unwrap();
        WordCloudBroadcaster::new(db, redis, settings.wordcloud)
    }

    #[test]
    fn test_clean_text_keeps_ideographs_only() {
        assert_eq!(clean_text("比赛 great! 2024，精彩"), "比赛精彩");
        assert_eq!(clean_text("hello"), "");
    }

    #[test]
    fn test_selection_rules() {
        let segments = [
            ("精彩", "a"),
            ("比赛", "n"),
            ("参加", "v"),
            ("赛事", "n"),
            ("裁判", "n"),
            ("我", "r"),
            ("好", "a"),
            ("场地", "n"),
        ];
        let tokens = select_tokens(&segments);
        assert_eq!(tokens, vec!["精彩比赛", "比赛", "裁判", "场地"]);
    }

    #[test]
    fn test_nouns_of_any_subtype_count() {
        let segments = [("北京", "ns"), ("获得", "v"), ("冠军", "nr")];
        assert_eq!(select_tokens(&segments), vec!["北京", "获得冠军", "冠军"]);
    }

    #[test]
    fn test_extract_ignores_non_chinese() {
        assert!(extract_tokens("GREAT GAME!!! 100%").is_empty());
        assert!(extract_tokens("").is_empty());
    }

    #[test]
    fn test_extract_never_emits_stop_words() {
        let tokens = extract_tokens("我们的赛事和运动都很精彩，北京的场地也很好");
        assert!(tokens.iter().all(|t| !STOP_WORDS.contains(&t.as_str())));
        assert!(tokens.iter().all(|t| t.chars().count() >= 2));
    }

    #[test]
    fn test_top_words_ties_keep_first_seen() {
        let tokens = ["场地", "裁判", "裁判", "比赛", "场地", "观众"]
            .iter()
            .map(|s| s.to_string());
        let words = top_words(tokens, 3);
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["场地", "裁判", "比赛"]);
        assert_eq!(words[0].weight, 2);
    }

    #[test]
    fn test_message_shape() {
        let words = vec![WordWeight { text: "比赛".into(), weight: 3 }];
        let json = serde_json::to_value(WordCloudMessage::update(&words)).unwrap();
        assert_eq!(json["type"], "wordcloud_update");
        assert_eq!(json["payload"][0]["text"], "比赛");
        assert_eq!(json["payload"][0]["weight"], 3);
    }

    #[tokio::test]
    async fn test_subscribers_see_latest_snapshot() {
        let hub = broadcaster();
        let mut rx = hub.subscribe();

        hub.publish(vec![WordWeight { text: "第一".into(), weight: 1 }]);
        hub.publish(vec![WordWeight { text: "第二".into(), weight: 2 }]);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update()[0].text, "第二");
        assert_eq!(hub.current()[0].weight, 2);
    }

    #[tokio::test]
    async fn test_marks_coalesce() {
        let hub = broadcaster();
        hub.mark_dirty();
        hub.mark_dirty();

        // one stored permit satisfies the first wait, the second would block
        hub.shared.dirty.notified().await;
        let second = tokio::time::timeout(Duration::from_millis(20), hub.shared.dirty.notified()).await;
        assert!(second.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_still_recomputes_on_tick() {
        let hub = broadcaster();
        let period = Duration::from_secs(hub.shared.config.refresh_secs);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

        let started = Instant::now();
        assert_eq!(hub.next_trigger(&mut ticker).await, Trigger::Tick);
        assert!(started.elapsed() >= period);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_wins_over_distant_tick() {
        let hub = broadcaster();
        let period = Duration::from_secs(hub.shared.config.refresh_secs);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

        hub.mark_dirty();
        let started = Instant::now();
        assert_eq!(hub.next_trigger(&mut ticker).await, Trigger::Marked);
        assert!(started.elapsed() < period);
    }

    proptest::proptest! {
        #[test]
        fn prop_clean_text_keeps_only_ideographs(raw in "\\PC{0,64}") {
            let clean = clean_text(&raw);
            proptest::prop_assert!(
                clean.chars().all(|c| ('\u{4e00}'..='\u{9fa5}').contains(&c)),
                "non-ideograph kept in {:?}",
                clean
            );
            proptest::prop_assert!(clean.chars().count() <= raw.chars().count());
        }

        #[test]
        fn prop_top_words_sorted_and_bounded(
            tokens in proptest::collection::vec("[a-e]{1,2}", 0..80),
            max_words in 0usize..10,
        ) {
            let words = top_words(tokens.clone(), max_words);
            proptest::prop_assert!(words.len() <= max_words);
            proptest::prop_assert!(words.windows(2).all(|w| w[0].weight >= w[1].weight));
            for word in &words {
                let count = tokens.iter().filter(|t| **t == word.text).count();
                proptest::prop_assert_eq!(word.weight, count);
            }
        }
    }
}
