//! 浅合并补丁
//!
//! 配置和几何数据都是强类型结构体。补丁以 JSON 对象给出，
//! 合并时先把目标序列化成 JSON，只覆盖目标已有的键（嵌套对象递归合并），
//! 再反序列化回去。目标没有的键被忽略，保证前向兼容。
//! 任何已知键的值类型不合法时整个补丁被拒绝，目标保持不变。

use crate::error::SceneError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// 补丁对象类型
pub type Patch = Map<String, Value>;

/// 合并结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// 是否有任何键的值发生变化
    pub changed: bool,
    /// 目标中不存在、被忽略的顶层键
    pub unknown: Vec<String>,
}

/// 将补丁合并到强类型目标中
pub fn merge_patch<T>(target: &mut T, patch: &Patch) -> Result<MergeOutcome, SceneError>
where
    T: Serialize + DeserializeOwned,
{
    let mut current = serde_json::to_value(&*target)?;
    let Value::Object(fields) = &mut current else {
        return Err(SceneError::InvalidPatch(
            "patch target is not an object".to_string(),
        ));
    };

    let unknown = patch
        .keys()
        .filter(|k| !fields.contains_key(*k))
        .cloned()
        .collect();
    let changed = merge_known(fields, patch);

    if changed {
        *target = serde_json::from_value(current)?;
    }

    Ok(MergeOutcome { changed, unknown })
}

/// 只覆盖已存在的键，返回是否有变化
fn merge_known(target: &mut Map<String, Value>, patch: &Map<String, Value>) -> bool {
    let mut changed = false;
    for (key, value) in patch {
        let Some(slot) = target.get_mut(key) else {
            continue;
        };
        match (slot, value) {
            (Value::Object(inner), Value::Object(sub)) => {
                changed |= merge_known(inner, sub);
            }
            (slot, value) => {
                if !json_eq(slot, value) {
                    *slot = value.clone();
                    changed = true;
                }
            }
        }
    }
    changed
}

/// 数值按浮点比较，`1` 与 `1.0` 视为相等
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| json_eq(p, q))
        }
        _ => a == b,
    }
}

/// 从 `serde_json::json!` 风格的值构造补丁；非对象返回空补丁
pub fn patch_from_value(value: Value) -> Patch {
    match value {
        Value::Object(map) => map,
        _ => Patch::new(),
    }
}

/// 把较新的补丁叠加到尚未应用的补丁上：逐键后写覆盖，嵌套对象递归叠加
pub fn combine_patches(base: &mut Patch, newer: Patch) {
    for (key, value) in newer {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(inner)), Value::Object(sub)) => combine_patches(inner, sub),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
