use std::fmt;

/// Wildcard pattern over `/`-separated topic names.
///
/// `*` matches exactly one segment, `#` matches everything that follows.
/// Empty segments count, so `/orders`, `orders/` and `orders` are distinct.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TopicMatcher {
    pattern: String,
    segments: Vec<String>,
}

impl TopicMatcher {
    pub fn new(pattern: &str) -> Self {
        let segments = split(pattern).map(String::from).collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    pub fn matches(&self, topic: &str) -> bool {
        let mut topic_iter = split(topic);

        for pattern_segment in &self.segments {
            match pattern_segment.as_str() {
                "#" => return true,
                "*" => {
                    if topic_iter.next().is_none() {
                        return false;
                    }
                }
                segment => match topic_iter.next() {
                    Some(topic_segment) if topic_segment == segment => {}
                    _ => return false,
                },
            }
        }

        topic_iter.next().is_none()
    }
}

fn split(s: &str) -> impl Iterator<Item = &str> {
    s.split('/')
}

impl fmt::Display for TopicMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}
