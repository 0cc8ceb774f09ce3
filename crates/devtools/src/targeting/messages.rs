use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageSeverity {
    Neutral,
    Positive,
    Negative,
    RejectInput,
}

impl MessageSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::RejectInput => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub severity: MessageSeverity,
    pub text: String,
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.text)
    }
}

/// Bounded notification feed; the oldest entry is dropped first.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<StatusMessage>,
    capacity: usize,
    total_pushed: u64,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total_pushed: 0,
        }
    }

    pub fn push(&mut self, severity: MessageSeverity, text: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(StatusMessage {
            severity,
            text: text.into(),
        });
        self.total_pushed += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusMessage> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&StatusMessage> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of messages ever pushed, including evicted ones.
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let mut log = MessageLog::new(2);
        log.push(MessageSeverity::Neutral, "a");
        log.push(MessageSeverity::Positive, "b");
        log.push(MessageSeverity::Negative, "c");

        let texts = log.iter().map(|m| m.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(log.total_pushed(), 3);
        assert_eq!(
            log.latest().expect("latest").severity,
            MessageSeverity::Negative
        );
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let mut log = MessageLog::new(0);
        log.push(MessageSeverity::RejectInput, "x");
        log.push(MessageSeverity::RejectInput, "y");
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().expect("latest").to_string(), "[rejected] y");
    }
}
