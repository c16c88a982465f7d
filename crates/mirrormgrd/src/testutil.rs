//! Test support: a recording mock of the management channel.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mirror_common::{ManagementChannel, MirrorError, MirrorResult};

enum Reply {
    Output(String),
    ChannelError(String),
}

struct Rule {
    pattern: String,
    reply: Reply,
}

/// Mock channel that records every command and answers from a fixed rule
/// set. The first rule whose pattern is a substring of the command wins;
/// unmatched commands succeed with empty output.
#[derive(Default)]
pub struct MockChannel {
    rules: Mutex<Vec<Rule>>,
    commands: Mutex<Vec<String>>,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Commands containing `pattern` answer with `output`.
    pub fn respond(&self, pattern: &str, output: &str) {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            reply: Reply::Output(output.to_string()),
        });
    }

    /// Commands containing `pattern` fail with a channel error.
    pub fn fail(&self, pattern: &str, message: &str) {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            reply: Reply::ChannelError(message.to_string()),
        });
    }

    /// Every command executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Number of executed commands containing `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }
}

#[async_trait]
impl ManagementChannel for MockChannel {
    async fn run(&self, cmd: &str) -> MirrorResult<String> {
        self.commands.lock().unwrap().push(cmd.to_string());

        let rules = self.rules.lock().unwrap();
        for rule in rules.iter() {
            if cmd.contains(&rule.pattern) {
                return match &rule.reply {
                    Reply::Output(output) => Ok(output.clone()),
                    Reply::ChannelError(message) => Err(MirrorError::channel(cmd, message.clone())),
                };
            }
        }
        Ok(String::new())
    }
}
