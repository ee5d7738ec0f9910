// 工具函数模块
// 包含金额换算、渠道验签、微信XML编解码等通用工具

pub mod amount;
pub mod crypto;
pub mod xml;

// 重新导出常用函数
pub use amount::*;
pub use crypto::*;
pub use xml::*;
