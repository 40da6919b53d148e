//! 扫码登录流程状态机
//!
//! 把"签发二维码 → 等待 → 轮询 → (过期则重新签发)"的循环拆成显式状态,
//! 由外部驱动器按 [`QrLoginFlow::next_step`] 执行I/O和计时,再把结果喂回来。
//! 状态机本身不做任何I/O,取消与时间推进都由驱动器控制。
//!
//! ```text
//! NeedTicket --ticket_issued--> Waiting --waited--> Polling
//!     ^                            ^                  |
//!     |                            +----- Pending ----+
//!     +------------------------------- Expired -------+
//!                                                     |
//!                                       Success --> Finished
//! ```

use std::time::Duration;

use crate::models::qr_ticket::QrPollStatus;

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    NeedTicket,
    Waiting,
    Polling,
    Finished,
}

/// 驱动器下一步要做的事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrFlowStep {
    /// 向服务端申请新的二维码
    RequestTicket,

    /// 等待一个轮询间隔
    Wait(Duration),

    /// 轮询当前票据
    Poll,

    /// 扫码成功,刷新账号信息后结束
    Finish,
}

#[derive(Debug, Clone)]
pub struct QrLoginFlow {
    state: FlowState,
    interval: Duration,
    tickets_issued: u32,
    polls: u32,
}

impl QrLoginFlow {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: FlowState::NeedTicket,
            interval,
            tickets_issued: 0,
            polls: 0,
        }
    }

    pub fn next_step(&self) -> QrFlowStep {
        match self.state {
            FlowState::NeedTicket => QrFlowStep::RequestTicket,
            FlowState::Waiting => QrFlowStep::Wait(self.interval),
            FlowState::Polling => QrFlowStep::Poll,
            FlowState::Finished => QrFlowStep::Finish,
        }
    }

    /// 新票据已签发
    pub fn ticket_issued(&mut self) {
        if self.state == FlowState::NeedTicket {
            self.tickets_issued += 1;
            self.state = FlowState::Waiting;
        }
    }

    /// 等待结束
    pub fn waited(&mut self) {
        if self.state == FlowState::Waiting {
            self.state = FlowState::Polling;
        }
    }

    /// 喂入一次轮询结果
    pub fn observe(&mut self, status: QrPollStatus) {
        if self.state != FlowState::Polling {
            return;
        }
        self.polls += 1;
        self.state = match status {
            QrPollStatus::Pending => FlowState::Waiting,
            QrPollStatus::Expired => FlowState::NeedTicket,
            QrPollStatus::Success => FlowState::Finished,
        };
    }

    pub fn is_finished(&self) -> bool {
        self.state == FlowState::Finished
    }

    /// 已签发的票据数 (含首张)
    pub fn tickets_issued(&self) -> u32 {
        self.tickets_issued
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }
}

impl Default for QrLoginFlow {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
