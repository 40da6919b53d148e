use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 判定已登录所需的最短用户ID长度 (不含)
const MIN_USER_ID_LEN: usize = 8;

/// 由用户ID判断是否已登录
///
/// 服务端约定: 未登录时 `userId` 为空或很短的占位值,
/// 真实用户ID长度大于8。这是唯一的登录判定依据。
pub fn user_id_indicates_login(user_id: &str) -> bool {
    user_id.chars().count() > MIN_USER_ID_LEN
}

/// 绑定到账号的打印设备
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// 设备名称 (smartName)
    pub name: String,

    /// 设备GUID (smartGuid),打印时作为目标
    pub guid: String,
}

/// 账号信息缓存
///
/// 只由"刷新账号信息"操作写入,注销时清空。
/// 登录状态是它的派生属性,没有单独的标志位。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub user_id: String,
    pub user_name: String,
    pub devices: Vec<Device>,
}

impl AccountInfo {
    pub fn is_authenticated(&self) -> bool {
        user_id_indicates_login(&self.user_id)
    }

    pub fn device(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub fn clear(&mut self) {
        self.user_id.clear();
        self.user_name.clear();
        self.devices.clear();
    }
}

/// `DataType=LoginWeb` 成功响应中的账号字段
#[derive(Debug, Deserialize)]
pub(crate) struct LoginWebPayload {
    #[serde(rename = "userId", deserialize_with = "lenient_string")]
    user_id: String,

    #[serde(rename = "userName", default, deserialize_with = "lenient_string")]
    user_name: String,

    #[serde(rename = "smartCores", default, deserialize_with = "nullable_vec")]
    smart_cores: Vec<SmartCore>,
}

#[derive(Debug, Deserialize)]
struct SmartCore {
    #[serde(rename = "smartName", default, deserialize_with = "lenient_string")]
    smart_name: String,

    #[serde(rename = "smartGuid", deserialize_with = "lenient_string")]
    smart_guid: String,
}

impl From<LoginWebPayload> for AccountInfo {
    fn from(payload: LoginWebPayload) -> Self {
        Self {
            user_id: payload.user_id,
            user_name: payload.user_name,
            devices: payload
                .smart_cores
                .into_iter()
                .map(|core| Device {
                    name: core.smart_name,
                    guid: core.smart_guid,
                })
                .collect(),
        }
    }
}

/// 字符串字段容忍数字和null
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
