//! Conversation assembly and pair ranking over provider casts.
//!
//! Both operations use the same membership rule: a cast belongs to the pair
//! `{a, b}` when it is authored by one of them and mentions the other. That
//! keeps a pair's trending count equal to the length of its conversation
//! over the same window of casts.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{Cast, Fid, Subcast};

/// Whether `cast` is a subcast between `a` and `b`.
#[must_use]
pub fn is_subcast_between(cast: &Cast, a: Fid, b: Fid) -> bool {
    a != b
        && ((cast.author_fid == a && cast.mentions(b))
            || (cast.author_fid == b && cast.mentions(a)))
}

/// Build the conversation between `a` and `b` from an unordered batch of
/// casts.
///
/// Casts outside the pair are dropped, duplicate hashes are collapsed to the
/// first occurrence and the result is ordered newest first. Reciprocity is
/// computed over the whole result and stamped on every record.
#[must_use]
pub fn build_conversation<I>(a: Fid, b: Fid, casts: I) -> Vec<Subcast>
where
    I: IntoIterator<Item = Cast>,
{
    let mut seen = HashSet::new();
    let mut subcasts: Vec<Subcast> = casts
        .into_iter()
        .filter(|cast| is_subcast_between(cast, a, b))
        .filter(|cast| seen.insert(cast.hash.clone()))
        .map(Subcast::from_cast)
        .collect();

    subcasts.sort_by(|x, y| y.timestamp.cmp(&x.timestamp));

    let a_to_b = subcasts.iter().any(|s| s.fid == a);
    let b_to_a = subcasts.iter().any(|s| s.fid == b);
    let reciprocal = a_to_b && b_to_a;
    for subcast in &mut subcasts {
        subcast.is_reciprocal = reciprocal;
    }

    subcasts
}

/// Aggregated activity of one unordered pair, keyed by fids with the lower
/// fid first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairActivity {
    /// The pair, lower fid first.
    pub fids: (Fid, Fid),
    /// Number of subcasts exchanged.
    pub subcast_count: u64,
    /// Timestamp of the newest subcast.
    pub last_activity: DateTime<Utc>,
    /// Whether both users mentioned each other.
    pub is_reciprocal: bool,
}

impl PairActivity {
    /// Activity of the pair `{a, b}` as its conversation shows it. `None`
    /// for an empty conversation.
    #[must_use]
    pub fn from_conversation(a: Fid, b: Fid, conversation: &[Subcast]) -> Option<Self> {
        let last_activity = conversation.iter().map(|s| s.timestamp).max()?;
        Some(Self {
            fids: (a.min(b), a.max(b)),
            subcast_count: u64::try_from(conversation.len()).unwrap_or(u64::MAX),
            last_activity,
            is_reciprocal: conversation.iter().any(|s| s.is_reciprocal),
        })
    }
}

/// Order pairs by subcast count, then most recent activity, then fids.
pub fn sort_by_activity(pairs: &mut [PairActivity]) {
    pairs.sort_by(|x, y| {
        y.subcast_count
            .cmp(&x.subcast_count)
            .then_with(|| y.last_activity.cmp(&x.last_activity))
            .then_with(|| x.fids.cmp(&y.fids))
    });
}

#[derive(Default)]
struct PairTally {
    count: u64,
    last: Option<DateTime<Utc>>,
    low_mentions_high: bool,
    high_mentions_low: bool,
}

/// Aggregate casts into pair activity, ranked by subcast count, then by
/// most recent activity, then by fids.
///
/// A cast mentioning several users counts once toward each pair it opens.
/// Self-mentions and duplicate hashes are ignored.
#[must_use]
pub fn rank_pairs<I>(casts: I) -> Vec<PairActivity>
where
    I: IntoIterator<Item = Cast>,
{
    let mut seen = HashSet::new();
    let mut tallies: HashMap<(Fid, Fid), PairTally> = HashMap::new();

    for cast in casts {
        if !seen.insert(cast.hash.clone()) {
            continue;
        }

        let author = cast.author_fid;
        for &mentioned in &cast.mentioned_fids {
            if mentioned == author {
                continue;
            }

            let key = (author.min(mentioned), author.max(mentioned));
            let tally = tallies.entry(key).or_default();
            tally.count += 1;
            tally.last = Some(tally.last.map_or(cast.timestamp, |t| t.max(cast.timestamp)));
            if author == key.0 {
                tally.low_mentions_high = true;
            } else {
                tally.high_mentions_low = true;
            }
        }
    }

    let mut ranked: Vec<PairActivity> = tallies
        .into_iter()
        .filter_map(|(fids, tally)| {
            Some(PairActivity {
                fids,
                subcast_count: tally.count,
                last_activity: tally.last?,
                is_reciprocal: tally.low_mentions_high && tally.high_mentions_low,
            })
        })
        .filter(|pair| pair.subcast_count > 0)
        .collect();

    sort_by_activity(&mut ranked);
    ranked
}
