use indexmap::IndexMap;
use url::Url;

use super::state::TransferState;
use crate::core::transport::TransferHandle;

/// 下载列表：URL 到状态的有序映射，顺序即插入顺序
///
/// 对外通知中的下标必须与这里的位置完全一致，所以删除一律用 `shift_remove`。
#[derive(Debug, Default)]
pub struct DownloadRegistry {
    entries: IndexMap<Url, TransferState>,
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.entries.contains_key(url)
    }

    pub fn index_of(&self, url: &Url) -> Option<usize> {
        self.entries.get_index_of(url)
    }

    pub fn get(&self, url: &Url) -> Option<&TransferState> {
        self.entries.get(url)
    }

    /// 返回条目的位置与可变状态
    pub fn get_full_mut(&mut self, url: &Url) -> Option<(usize, &mut TransferState)> {
        self.entries.get_full_mut(url).map(|(index, _, state)| (index, state))
    }

    /// 追加新条目并返回其位置；URL 已存在时不做任何修改
    pub fn insert(&mut self, url: Url, state: TransferState) -> Option<usize> {
        if self.entries.contains_key(&url) {
            return None;
        }
        let (index, _) = self.entries.insert_full(url, state);
        Some(index)
    }

    /// 按句柄查找正在运行（`Active` 或 `Suspending`）的条目
    pub fn find_live(&self, handle: TransferHandle) -> Option<(usize, &Url)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, (_, state))| state.live_handle() == Some(handle))
            .map(|(index, (url, _))| (index, url))
    }

    pub fn find_live_mut(&mut self, handle: TransferHandle) -> Option<(usize, &mut TransferState)> {
        self.entries
            .iter_mut()
            .enumerate()
            .find(|(_, (_, state))| state.live_handle() == Some(handle))
            .map(|(index, (_, state))| (index, state))
    }

    /// 删除条目，后面的条目依次前移
    pub fn remove(&mut self, url: &Url) -> Option<(usize, TransferState)> {
        self.entries
            .shift_remove_full(url)
            .map(|(index, _, state)| (index, state))
    }

    /// 一次清空，返回所有被删除的状态
    pub fn clear(&mut self) -> Vec<TransferState> {
        self.entries.drain(..).map(|(_, state)| state).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Url, &TransferState)> {
        self.entries.iter()
    }
}
