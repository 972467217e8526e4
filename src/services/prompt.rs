//! 操作者交互
//!
//! 问题写到 stderr，结果消息写到 stdout，方便脚本只解析 stdout

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

/// 交互接口
pub trait Prompt: Send + Sync {
    /// 是/否确认，直到得到有效回答为止
    fn ask_yes_no(&self, question: &str, default_yes: bool) -> bool;

    /// 读取一行输入；非交互模式或输入结束时返回 `None`
    fn read_line(&self, question: &str) -> Option<String>;

    /// 输出一行给操作者
    fn show(&self, line: &str);
}

/// 基于标准输入输出的实现
///
/// 只有显式关闭交互时才使用默认答案；输入已结束按拒绝处理
pub struct StdinPrompt {
    disable_interactivity: bool,
    input: Mutex<Box<dyn BufRead + Send>>,
}

impl StdinPrompt {
    pub fn new(disable_interactivity: bool) -> Self {
        Self::with_input(disable_interactivity, io::BufReader::new(io::stdin()))
    }

    /// 从任意输入源读取回答
    pub fn with_input(disable_interactivity: bool, input: impl BufRead + Send + 'static) -> Self {
        Self {
            disable_interactivity,
            input: Mutex::new(Box::new(input)),
        }
    }
}

/// `y` / `yes` 为是，`n` / `no` 为否，大小写不敏感
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

impl Prompt for StdinPrompt {
    fn ask_yes_no(&self, question: &str, default_yes: bool) -> bool {
        if self.disable_interactivity {
            return default_yes;
        }
        loop {
            match self.read_line(&format!("{} [y/n]", question)) {
                Some(answer) => {
                    if let Some(yes) = parse_yes_no(&answer) {
                        return yes;
                    }
                }
                // 输入已关闭，没有人确认
                None => return false,
            }
        }
    }

    fn read_line(&self, question: &str) -> Option<String> {
        if self.disable_interactivity {
            return None;
        }
        let mut stderr = io::stderr();
        let _ = writeln!(stderr, "{} ", question);
        let _ = stderr.flush();

        let mut input = self.input.lock().ok()?;
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn show(&self, line: &str) {
        println!("{}", line);
    }
}
