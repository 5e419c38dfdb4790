//! 参考帧池
//!
//! 三个图像缓冲按角色轮换: 当前重建帧, 最新参考帧 (ref0), 较早参考帧 (ref1).
//! 非 B 帧解码完成后只交换角色, 不复制像素.

use m4v_core::{M4vError, M4vResult};

use super::picture::Picture;

/// 池中缓冲数
pub(super) const POOL_SIZE: usize = 3;

#[derive(Debug)]
pub(super) struct ReferencePool {
    pictures: Vec<Picture>,
    current: usize,
    newer: usize,
    older: usize,
}

impl ReferencePool {
    /// 按宏块网格分配三个缓冲, 全部清成黑色
    pub(super) fn new(mb_width: usize, mb_height: usize) -> Self {
        let mut pictures: Vec<Picture> = (0..POOL_SIZE).map(|_| Picture::new(mb_width, mb_height)).collect();
        for pic in pictures.iter_mut() {
            pic.clear();
        }
        Self {
            pictures,
            current: 0,
            newer: 1,
            older: 2,
        }
    }

    pub(super) fn current(&self) -> &Picture {
        &self.pictures[self.current]
    }

    pub(super) fn current_mut(&mut self) -> &mut Picture {
        &mut self.pictures[self.current]
    }

    /// 最新参考帧 (ref0)
    pub(super) fn newer(&self) -> &Picture {
        &self.pictures[self.newer]
    }

    /// 同时借出 (当前帧, ref0, ref1)
    pub(super) fn split(&mut self) -> M4vResult<(&mut Picture, &Picture, &Picture)> {
        let mut current = None;
        let mut newer = None;
        let mut older = None;
        for (i, pic) in self.pictures.iter_mut().enumerate() {
            if i == self.current {
                current = Some(pic);
            } else if i == self.newer {
                newer = Some(&*pic);
            } else if i == self.older {
                older = Some(&*pic);
            }
        }
        match (current, newer, older) {
            (Some(c), Some(n), Some(o)) => Ok((c, n, o)),
            _ => Err(M4vError::Internal("参考帧角色重叠".into())),
        }
    }

    /// 当前帧成为 ref0, 原 ref0 成为 ref1, 原 ref1 的缓冲留作下一帧
    pub(super) fn rotate(&mut self) {
        let recycled = self.older;
        self.older = self.newer;
        self.newer = self.current;
        self.current = recycled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_轮换角色() {
        let mut pool = ReferencePool::new(1, 1);
        pool.current_mut().y.fill(1);
        pool.rotate();
        assert_eq!(pool.newer().y.get(0, 0), 1);

        pool.current_mut().y.fill(2);
        pool.rotate();
        let (cur, r0, r1) = pool.split().unwrap();
        assert_eq!(r0.y.get(0, 0), 2);
        assert_eq!(r1.y.get(0, 0), 1);
        // 回收的是最早的缓冲 (初始清空为 0)
        assert_eq!(cur.y.get(0, 0), 0);
    }

    #[test]
    fn test_初始为黑色() {
        let pool = ReferencePool::new(2, 2);
        assert_eq!(pool.current().y.get(5, 5), 0);
        assert_eq!(pool.newer().u.get(3, 3), 128);
    }
}
