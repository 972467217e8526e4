//! 测试用的假执行器：记录每次调用并按脚本返回结果

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::command::{CommandError, CommandOutput, OutputMode, ProcessRunner};

type Rule = (Vec<String>, VecDeque<CommandOutput>);

/// 录制型执行器
///
/// 规则按参数前缀匹配（包含程序名），同一前缀可排队多个结果，
/// 最后一个结果会被重复使用；未匹配的调用返回成功且输出为空
#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为以 `prefix` 开头的调用追加一个返回结果
    pub fn respond(&self, prefix: &[&str], output: CommandOutput) -> &Self {
        let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        let mut rules = self.rules.lock().unwrap();
        if let Some((_, queue)) = rules.iter_mut().find(|(p, _)| *p == prefix) {
            queue.push_back(output);
        } else {
            rules.push((prefix, VecDeque::from([output])));
        }
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// 以空格拼接的调用记录，方便断言
    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.join(" ")).collect()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        _mode: OutputMode,
    ) -> Result<CommandOutput, CommandError> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(|a| a.to_string()));
        self.calls.lock().unwrap().push(call.clone());

        let mut rules = self.rules.lock().unwrap();
        let matched = rules
            .iter_mut()
            .filter(|(prefix, _)| call.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len());

        Ok(match matched {
            Some((_, queue)) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some((_, queue)) => queue.front().cloned().unwrap_or_default(),
            None => CommandOutput::default(),
        })
    }
}
