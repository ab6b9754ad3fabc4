// ==========================================
// 班组管理系统 - 配置差异比对
// ==========================================
// 将 JSON 展平为 a.b[0] 形式的路径后逐项比较
// ==========================================

use crate::domain::algorithm::ConfigDiff;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// 展平 JSON: 对象键以 "." 连接，数组下标为 "[i]"
pub fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(child, path, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(child, format!("{}[{}]", prefix, i), out);
            }
        }
        _ => {
            out.insert(prefix, value.clone());
        }
    }
}

/// 比较两份配置，返回按路径排序的差异项
pub fn diff_configs(old: Option<&Value>, new: Option<&Value>) -> Vec<ConfigDiff> {
    let old_flat = old.map(flatten).unwrap_or_default();
    let new_flat = new.map(flatten).unwrap_or_default();
    let keys: BTreeSet<&String> = old_flat.keys().chain(new_flat.keys()).collect();

    keys.into_iter()
        .filter_map(|path| {
            let before = old_flat.get(path);
            let after = new_flat.get(path);
            if before == after {
                return None;
            }
            Some(ConfigDiff {
                path: path.clone(),
                old: before.cloned(),
                new: after.cloned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_paths() {
        let flat = flatten(&json!({"a": {"b": 1, "c": [10, {"d": true}]}}));
        assert_eq!(flat.get("a.b"), Some(&json!(1)));
        assert_eq!(flat.get("a.c[0]"), Some(&json!(10)));
        assert_eq!(flat.get("a.c[1].d"), Some(&json!(true)));
    }

    #[test]
    fn test_diff_only_changed_sorted() {
        let old = json!({"x": 1, "y": {"z": [1, 2]}, "gone": "v"});
        let new = json!({"x": 1, "y": {"z": [1, 3]}, "added": 5});
        let diff = diff_configs(Some(&old), Some(&new));
        let paths: Vec<&str> = diff.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["added", "gone", "y.z[1]"]);
        assert_eq!(diff[0].old, None);
        assert_eq!(diff[1].new, None);
        assert_eq!(diff[2].old, Some(json!(2)));
        assert_eq!(diff[2].new, Some(json!(3)));

        assert_eq!(diff_configs(None, Some(&json!({"k": 1}))).len(), 1);
        assert!(diff_configs(Some(&old), Some(&old)).is_empty());
    }
}
