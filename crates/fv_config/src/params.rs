// crates/fv_config/src/params.rs

//! 类型驱动的参数读取
//!
//! 控制文件被切分为顶层块的 token 序列（[`ControlsText`]），
//! 各驱动按自己的登记表（[`Schema`]：键 → 类型标签）提取
//! 所需的值。一个键消费多少 token 由类型标签决定：
//!
//! - `Scalar` / `Int` / `Word` / `Bool`: 1 个 token
//! - `Vector`: 3 个 token
//! - `Enum`: 1 个 token，大小写不敏感匹配候选表
//! - `ScalarList` / `VectorList` / `WordList`: `N { v1 ... vN }`
//!
//! 未知键记录 `UNKNOWN` 后跳过；未知枚举值回退到 0 号变体。
//! 湍流模型等组件可以在提取前向同一块的登记表追加自己的键。

use std::collections::HashMap;

use fv_core::{Scalar, Vector};

use crate::ConfigError;

// ============================================================
// 类型标签与值
// ============================================================

/// 参数类型标签
#[derive(Debug, Clone, Copy)]
pub enum TypeTag {
    /// 整数
    Int,
    /// 标量
    Scalar,
    /// 三分量向量
    Vector,
    /// YES / NO 布尔
    Bool,
    /// 任意单词（求解器名、网格名）
    Word,
    /// 枚举：候选表内大小写不敏感匹配，未知回退 0 号
    Enum(&'static [&'static str]),
    /// 标量列表 `N { ... }`
    ScalarList,
    /// 向量列表 `N { ... }`
    VectorList,
}

/// 已解析的参数值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Scalar(Scalar),
    Vector(Vector),
    Bool(bool),
    Word(String),
    /// 枚举变体序号
    Enum(usize),
    ScalarList(Vec<Scalar>),
    VectorList(Vec<Vector>),
}

impl Value {
    /// 取整数值
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// 取标量值
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Int(v) => Some(*v as Scalar),
            _ => None,
        }
    }

    /// 取向量值
    pub fn as_vector(&self) -> Option<Vector> {
        match self {
            Self::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// 取布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// 取单词值
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Self::Word(v) => Some(v),
            _ => None,
        }
    }

    /// 取枚举序号
    pub fn as_enum(&self) -> Option<usize> {
        match self {
            Self::Enum(v) => Some(*v),
            _ => None,
        }
    }

    /// 取向量列表
    pub fn as_vector_list(&self) -> Option<&[Vector]> {
        match self {
            Self::VectorList(v) => Some(v),
            _ => None,
        }
    }
}

// ============================================================
// 登记表
// ============================================================

/// 块的参数登记表：键 → 类型标签
#[derive(Debug, Default, Clone)]
pub struct Schema {
    tags: HashMap<String, TypeTag>,
}

impl Schema {
    /// 创建空登记表
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个键
    pub fn enroll(&mut self, key: &str, tag: TypeTag) -> &mut Self {
        self.tags.insert(key.to_string(), tag);
        self
    }

    /// 查找键的类型标签（大小写不敏感）
    fn lookup(&self, key: &str) -> Option<TypeTag> {
        if let Some(t) = self.tags.get(key) {
            return Some(*t);
        }
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, t)| *t)
    }
}

// ============================================================
// 控制文件
// ============================================================

/// 切分为顶层块的控制文件
///
/// 块内容以 token 序列原样保存，提取时才按登记表解释，
/// 因此湍流模型可以在读取 `piso` 块之前追加自己的键。
#[derive(Debug, Default, Clone)]
pub struct ControlsText {
    blocks: HashMap<String, Vec<String>>,
}

impl ControlsText {
    /// 从文本解析
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let tokens = lex(text);
        let mut blocks = HashMap::new();
        let mut i = 0;
        while i < tokens.len() {
            let name = tokens[i].clone();
            i += 1;
            if i >= tokens.len() || tokens[i] != "{" {
                return Err(ConfigError::structure(format!(
                    "顶层块 '{}' 缺少 '{{'",
                    name
                )));
            }
            let (body, next) = take_block(&tokens, i)?;
            blocks.insert(name.to_ascii_lowercase(), body);
            i = next;
        }
        Ok(Self { blocks })
    }

    /// 从文件读取并解析
    pub fn from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// 是否存在名为 name 的块
    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.contains_key(&name.to_ascii_lowercase())
    }

    /// 按登记表提取块内参数
    ///
    /// 块不存在时返回空表（一切取默认值）。未知键逐个记录
    /// `UNKNOWN` 并跳过；嵌套子块若未登记则整体跳过。
    pub fn extract(&self, block: &str, schema: &Schema) -> HashMap<String, Value> {
        self.extract_impl(block, schema, true)
    }

    /// 同 [`extract`](Self::extract)，未知键只记 debug 日志
    ///
    /// 供分两阶段读取的块使用（第一阶段只取选择器键，
    /// 其余键由第二阶段的完整登记表消费）。
    pub fn extract_silent(&self, block: &str, schema: &Schema) -> HashMap<String, Value> {
        self.extract_impl(block, schema, false)
    }

    fn extract_impl(&self, block: &str, schema: &Schema, warn: bool) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        let Some(tokens) = self.blocks.get(&block.to_ascii_lowercase()) else {
            return out;
        };

        let mut i = 0;
        while i < tokens.len() {
            let key = &tokens[i];
            i += 1;

            // 未登记的子块整体跳过（prepare/decomposition 等外部工具块）
            if i < tokens.len() && tokens[i] == "{" && schema.lookup(key).is_none() {
                match take_block(tokens, i) {
                    Ok((_, next)) => {
                        log::debug!("跳过子块 '{}'", key);
                        i = next;
                    }
                    Err(_) => break,
                }
                continue;
            }

            let Some(tag) = schema.lookup(key) else {
                if warn {
                    log::warn!("UNKNOWN 参数 '{}' (块 {})", key, block);
                } else {
                    log::debug!("跳过参数 '{}' (块 {})", key, block);
                }
                continue;
            };

            match consume(tokens, &mut i, key, tag) {
                Ok(v) => {
                    out.insert(key.to_ascii_lowercase(), v);
                }
                Err(e) => {
                    // 值解析失败按未知键处理：记录后继续
                    log::warn!("{}", e);
                }
            }
        }
        out
    }
}

/// 按类型标签从 token 流消费一个值
fn consume(
    tokens: &[String],
    i: &mut usize,
    key: &str,
    tag: TypeTag,
) -> Result<Value, ConfigError> {
    let mut next = |what: &str| -> Result<String, ConfigError> {
        if *i >= tokens.len() {
            return Err(ConfigError::bad_value(key, format!("缺少 {}", what)));
        }
        let t = tokens[*i].clone();
        *i += 1;
        Ok(t)
    };

    match tag {
        TypeTag::Int => {
            let t = next("整数")?;
            t.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ConfigError::bad_value(key, format!("'{}' 不是整数", t)))
        }
        TypeTag::Scalar => {
            let t = next("标量")?;
            t.parse::<Scalar>()
                .map(Value::Scalar)
                .map_err(|_| ConfigError::bad_value(key, format!("'{}' 不是数值", t)))
        }
        TypeTag::Vector => {
            let mut c = [0.0; 3];
            for v in &mut c {
                let t = next("向量分量")?;
                *v = t
                    .parse()
                    .map_err(|_| ConfigError::bad_value(key, format!("'{}' 不是数值", t)))?;
            }
            Ok(Value::Vector(Vector::new(c[0], c[1], c[2])))
        }
        TypeTag::Bool => {
            let t = next("YES/NO")?;
            // 未知值回退 NO，与枚举回退 0 号变体一致
            if t.eq_ignore_ascii_case("YES") {
                Ok(Value::Bool(true))
            } else {
                if !t.eq_ignore_ascii_case("NO") {
                    log::warn!("键 '{}' 的布尔值 '{}' 无法识别，取 NO", key, t);
                }
                Ok(Value::Bool(false))
            }
        }
        TypeTag::Word => Ok(Value::Word(next("单词")?)),
        TypeTag::Enum(list) => {
            let t = next("枚举值")?;
            let id = list.iter().position(|c| c.eq_ignore_ascii_case(&t));
            Ok(Value::Enum(id.unwrap_or_else(|| {
                log::warn!("键 '{}' 的枚举值 '{}' 无法识别，回退 {}", key, t, list[0]);
                0
            })))
        }
        TypeTag::ScalarList => {
            let n: usize = next("列表长度")?
                .parse()
                .map_err(|_| ConfigError::bad_value(key, "列表长度不是整数"))?;
            expect(key, &next("'{'")?, "{")?;
            let mut list = Vec::with_capacity(n);
            for _ in 0..n {
                let t = next("列表元素")?;
                list.push(
                    t.parse()
                        .map_err(|_| ConfigError::bad_value(key, format!("'{}' 不是数值", t)))?,
                );
            }
            expect(key, &next("'}'")?, "}")?;
            Ok(Value::ScalarList(list))
        }
        TypeTag::VectorList => {
            let n: usize = next("列表长度")?
                .parse()
                .map_err(|_| ConfigError::bad_value(key, "列表长度不是整数"))?;
            expect(key, &next("'{'")?, "{")?;
            let mut list = Vec::with_capacity(n);
            for _ in 0..n {
                let mut c = [0.0; 3];
                for v in &mut c {
                    let t = next("向量分量")?;
                    *v = t
                        .parse()
                        .map_err(|_| ConfigError::bad_value(key, format!("'{}' 不是数值", t)))?;
                }
                list.push(Vector::new(c[0], c[1], c[2]));
            }
            expect(key, &next("'}'")?, "}")?;
            Ok(Value::VectorList(list))
        }
    }
}

fn expect(key: &str, got: &str, want: &str) -> Result<(), ConfigError> {
    if got == want {
        Ok(())
    } else {
        Err(ConfigError::bad_value(
            key,
            format!("期望 '{}' 实际 '{}'", want, got),
        ))
    }
}

/// 词法切分：空白分隔，`{` `}` 总是独立 token，`#` 到行尾为注释
fn lex(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in text.lines() {
        let line = match line.find('#') {
            Some(p) => &line[..p],
            None => line,
        };
        let mut word = String::new();
        for ch in line.chars() {
            if ch == '{' || ch == '}' {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                tokens.push(ch.to_string());
            } else if ch.is_whitespace() {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
            } else {
                word.push(ch);
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
    }
    tokens
}

/// 取出从 tokens[start]（应为 `{`）开始的块体，返回 (块体, 下一位置)
fn take_block(tokens: &[String], start: usize) -> Result<(Vec<String>, usize), ConfigError> {
    debug_assert_eq!(tokens[start], "{");
    let mut depth = 0;
    for (j, t) in tokens.iter().enumerate().skip(start) {
        if t == "{" {
            depth += 1;
        } else if t == "}" {
            depth -= 1;
            if depth == 0 {
                return Ok((tokens[start + 1..j].to_vec(), j + 1));
            }
        }
    }
    Err(ConfigError::structure("块未闭合，缺少 '}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
general {
    solver piso
    dt 0.001
    gravity 0 0 -9.81   # 重力
    max_iterations 200
    les_average YES
    probe 2 { 0.5 0.5 0.5   1 1 1 }
}
piso {
    turbulence_model KE
}
"#;

    fn general_schema() -> Schema {
        let mut s = Schema::new();
        s.enroll("solver", TypeTag::Word)
            .enroll("dt", TypeTag::Scalar)
            .enroll("gravity", TypeTag::Vector)
            .enroll("max_iterations", TypeTag::Int)
            .enroll("les_average", TypeTag::Bool)
            .enroll("probe", TypeTag::VectorList);
        s
    }

    #[test]
    fn test_extract_basic() {
        let text = ControlsText::parse(SAMPLE).unwrap();
        let vals = text.extract("general", &general_schema());

        assert_eq!(vals["solver"].as_word(), Some("piso"));
        assert!((vals["dt"].as_scalar().unwrap() - 0.001).abs() < 1e-15);
        let g = vals["gravity"].as_vector().unwrap();
        assert!((g.z + 9.81).abs() < 1e-12);
        assert_eq!(vals["max_iterations"].as_int(), Some(200));
        assert_eq!(vals["les_average"].as_bool(), Some(true));
        assert_eq!(vals["probe"].as_vector_list().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_key_ignored() {
        let text = ControlsText::parse("general { bogus 42 dt 0.5 }").unwrap();
        let mut s = Schema::new();
        s.enroll("dt", TypeTag::Scalar);
        let vals = text.extract("general", &s);
        // bogus 与其值各记一次 UNKNOWN，dt 仍被读出
        assert!((vals["dt"].as_scalar().unwrap() - 0.5).abs() < 1e-15);
        assert!(!vals.contains_key("bogus"));
    }

    #[test]
    fn test_unknown_enum_falls_back() {
        let text = ControlsText::parse("general { scheme NOSUCH }").unwrap();
        let mut s = Schema::new();
        s.enroll("scheme", TypeTag::Enum(&["UDS", "CDS"]));
        let vals = text.extract("general", &s);
        assert_eq!(vals["scheme"].as_enum(), Some(0));
    }

    #[test]
    fn test_enum_case_insensitive() {
        let text = ControlsText::parse("general { scheme cds }").unwrap();
        let mut s = Schema::new();
        s.enroll("scheme", TypeTag::Enum(&["UDS", "CDS"]));
        let vals = text.extract("general", &s);
        assert_eq!(vals["scheme"].as_enum(), Some(1));
    }

    #[test]
    fn test_nested_unknown_block_skipped() {
        let text =
            ControlsText::parse("general { refinement { levels 3 } dt 0.25 }").unwrap();
        let mut s = Schema::new();
        s.enroll("dt", TypeTag::Scalar);
        let vals = text.extract("general", &s);
        assert!((vals["dt"].as_scalar().unwrap() - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_missing_block_is_empty() {
        let text = ControlsText::parse(SAMPLE).unwrap();
        let vals = text.extract("transport", &general_schema());
        assert!(vals.is_empty());
    }

    #[test]
    fn test_unbalanced_brace_is_error() {
        assert!(ControlsText::parse("general { dt 0.1").is_err());
    }

    #[test]
    fn test_braces_without_spaces() {
        let text = ControlsText::parse("general{dt 0.1}").unwrap();
        let mut s = Schema::new();
        s.enroll("dt", TypeTag::Scalar);
        let vals = text.extract("general", &s);
        assert!((vals["dt"].as_scalar().unwrap() - 0.1).abs() < 1e-15);
    }
}
