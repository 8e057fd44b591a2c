use rumqttc::Publish;
use std::fmt;

const PREVIEW_LEN: usize = 64;

/// A publish received on one of the subscribed topics
#[derive(Default, Clone, PartialEq, Eq, Debug)]
pub struct MQTTMessage {
    topic: String,
    content: Vec<u8>,
}

impl fmt::Display for MQTTMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.content);
        let preview: String = text.chars().take(PREVIEW_LEN).collect();
        if text.chars().count() > PREVIEW_LEN {
            write!(f, "{}: {}...", self.topic, preview)
        } else {
            write!(f, "{}: {}", self.topic, preview)
        }
    }
}

impl MQTTMessage {
    pub fn from_topic(topic: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        MQTTMessage {
            topic: topic.into(),
            content: content.into(),
        }
    }

    pub fn from_publish(publish: &Publish) -> Self {
        Self::from_topic(publish.topic.clone(), publish.payload.to_vec())
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}
