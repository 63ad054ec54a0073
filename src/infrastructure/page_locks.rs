//! 按 (表单, 页) 加锁
//!
//! 同一页的对账必须串行，不同页 / 不同表单互不影响。
//! 注册表只保留正在被持有或等待的锁，最后一个守卫释放时条目随之移除。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::Identifier;

type PageKey = (Identifier, u32);
type Registry = Arc<Mutex<HashMap<PageKey, Arc<AsyncMutex<()>>>>>;

/// 页锁注册表
#[derive(Debug, Default)]
pub struct PageLocks {
    locks: Registry,
}

/// 某页的锁守卫，drop 时释放锁并清理注册表
#[derive(Debug)]
pub struct PageGuard {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<AsyncMutex<()>>,
    key: PageKey,
    registry: Registry,
}

impl PageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取某页的互斥锁，持有守卫期间同页的其他对账会等待
    pub async fn acquire(&self, form_id: &Identifier, page: u32) -> PageGuard {
        let key = (form_id.clone(), page);
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.clone().lock_owned().await;
        PageGuard {
            guard: Some(guard),
            lock,
            key,
            registry: self.locks.clone(),
        }
    }

    /// 注册表中的锁数量
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        // 只剩注册表和本守卫两个引用，说明没有人在等这把锁
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}
