//! 工具参数 Schema 与输入解码（schemars 自动生成，serde 解码）
//!
//! 每个工具定义一个带 JsonSchema 的输入结构体：同一份定义既生成发送给模型的 input_schema，
//! 也用于校验模型给出的参数。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 由输入结构体生成 input_schema（draft-07，内联子 schema，去掉 $schema / title）
pub fn input_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(root).unwrap_or_else(|_| serde_json::json!({"type": "object"}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("title");
        obj.remove("definitions");
    }
    value
}

/// 解码工具输入；缺失字段报 "Missing 'x' parameter"，其余类型错误带上 serde 的说明
pub fn parse_input<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, String> {
    let args = if args.is_null() { serde_json::json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| {
        let msg = e.to_string();
        match missing_field(&msg) {
            Some(field) => format!("Missing '{}' parameter", field),
            None => format!("Invalid input for {}: {}", tool, msg),
        }
    })
}

/// 必填字符串不能为空
pub fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("Missing '{}' parameter", field))
    } else {
        Ok(())
    }
}

fn missing_field(msg: &str) -> Option<&str> {
    let rest = msg.strip_prefix("missing field `")?;
    rest.split('`').next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// 测试输入
    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct SampleInput {
        /// 路径
        path: String,
        #[serde(default)]
        recursive: bool,
    }

    #[test]
    fn test_schema_shape() {
        let schema = input_schema::<SampleInput>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["path"]["type"], "string");
        assert_eq!(schema["properties"]["path"]["description"], "路径");
        assert_eq!(schema["required"], serde_json::json!(["path"]));
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_input::<SampleInput>("sample", serde_json::json!({})).err().unwrap();
        assert_eq!(err, "Missing 'path' parameter");
        let err = parse_input::<SampleInput>("sample", Value::Null).err().unwrap();
        assert_eq!(err, "Missing 'path' parameter");
        let err = parse_input::<SampleInput>("sample", serde_json::json!({"path": 3})).err().unwrap();
        assert!(err.starts_with("Invalid input for sample: invalid type"), "{err}");
        assert_eq!(require("path", "  "), Err("Missing 'path' parameter".to_string()));
    }
}
