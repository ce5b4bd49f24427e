use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::RefCell;

/// 进度条按千分比显示
const BAR_LENGTH: u64 = 1000;

// 结构体：ProgressManager
// 每个下载一个进度条，顺序与下载列表中的位置一致
pub struct ProgressManager {
    multi: MultiProgress,
    bars: RefCell<Vec<ProgressBar>>,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// 不输出到终端，测试时使用
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        ProgressManager {
            multi: MultiProgress::with_draw_target(target),
            bars: RefCell::new(Vec::new()),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix:>4} [{bar:30.cyan/blue}] {percent:>3}% {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }

    /// 在 `index` 处插入新的进度条，后面的依次后移
    pub fn insert(&self, index: usize) {
        let mut bars = self.bars.borrow_mut();
        let index = index.min(bars.len());
        let bar = self.multi.insert(index, ProgressBar::new(BAR_LENGTH).with_style(Self::style()));
        bar.set_message("等待响应…");
        bars.insert(index, bar);
        Self::renumber(&bars);
    }

    pub fn remove(&self, index: usize) -> bool {
        let mut bars = self.bars.borrow_mut();
        if index >= bars.len() {
            return false;
        }
        let bar = bars.remove(index);
        bar.finish_and_clear();
        self.multi.remove(&bar);
        Self::renumber(&bars);
        true
    }

    pub fn clear(&self) {
        for bar in self.bars.borrow_mut().drain(..) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    pub fn set_fraction(&self, index: usize, fraction: f64) {
        if let Some(bar) = self.bars.borrow().get(index) {
            bar.set_position((fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64) as u64);
        }
    }

    pub fn set_message(&self, index: usize, message: impl Into<String>) {
        if let Some(bar) = self.bars.borrow().get(index) {
            bar.set_message(message.into());
        }
    }

    pub fn len(&self) -> usize {
        self.bars.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, index: usize) -> Option<u64> {
        self.bars.borrow().get(index).map(|bar| bar.position())
    }

    /// 在进度条上方打印一行
    pub fn println(&self, line: impl AsRef<str>) {
        if self.multi.println(line.as_ref()).is_err() {
            println!("{}", line.as_ref());
        }
    }

    fn renumber(bars: &[ProgressBar]) {
        for (index, bar) in bars.iter().enumerate() {
            bar.set_prefix(format!("#{}", index + 1));
        }
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}
