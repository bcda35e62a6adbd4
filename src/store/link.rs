use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::ConnectionManager};
use tracing::instrument;

use crate::models::link::{Answer, LinkRecord};

/// Records expire seven days after each write. Answering re-applies the
/// window, it does not extend it cumulatively.
pub const LINK_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

fn link_key(id: &str) -> String {
    format!("link:{id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Applied,
    Missing,
    AlreadyAnswered,
}

/// The durable map the three operations share. Production runs on Redis;
/// tests substitute an in-memory implementation.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn put(&self, id: &str, record: &LinkRecord) -> anyhow::Result<()>;

    async fn get(&self, id: &str) -> anyhow::Result<Option<LinkRecord>>;

    /// Transition `pending -> yes|no` exactly once. The guard must be
    /// evaluated against the stored value atomically with the write, so two
    /// concurrent calls cannot both apply.
    async fn answer(&self, id: &str, answer: Answer) -> anyhow::Result<AnswerOutcome>;
}

pub struct RedisLinkStore {
    conn: ConnectionManager,
    answer_script: Script,
}

// Decodes the stored record, checks the guard, and writes the terminal
// status in a single scripted call. Redis runs scripts atomically, which
// closes the double-submit race a plain GET/SET pair would leave open.
const ANSWER_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
  return 'missing'
end
local record = cjson.decode(raw)
if record['status'] ~= 'pending' then
  return 'answered'
end
record['status'] = ARGV[1]
redis.call('SET', KEYS[1], cjson.encode(record), 'EX', tonumber(ARGV[2]))
return 'ok'
"#;

impl RedisLinkStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            answer_script: Script::new(ANSWER_SCRIPT),
        }
    }
}

#[async_trait]
impl LinkStore for RedisLinkStore {
    #[instrument(name = "Store: put link", skip(self, record))]
    async fn put(&self, id: &str, record: &LinkRecord) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(record)?;
        conn.set_ex::<_, _, ()>(link_key(id), raw, LINK_TTL_SECONDS)
            .await?;
        Ok(())
    }

    #[instrument(name = "Store: get link", skip(self))]
    async fn get(&self, id: &str) -> anyhow::Result<Option<LinkRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(link_key(id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    #[instrument(name = "Store: answer link", skip(self))]
    async fn answer(&self, id: &str, answer: Answer) -> anyhow::Result<AnswerOutcome> {
        let mut conn = self.conn.clone();
        let verdict: String = self
            .answer_script
            .key(link_key(id))
            .arg(answer.as_str())
            .arg(LINK_TTL_SECONDS)
            .invoke_async(&mut conn)
            .await?;

        match verdict.as_str() {
            "ok" => Ok(AnswerOutcome::Applied),
            "missing" => Ok(AnswerOutcome::Missing),
            "answered" => Ok(AnswerOutcome::AlreadyAnswered),
            other => Err(anyhow::anyhow!("unexpected script verdict: {other}")),
        }
    }
}
