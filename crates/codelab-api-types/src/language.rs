use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiTypeError;

/// Languages the lab accepts, keyed the way the editor selects them.
///
/// Three total mappings hang off this enum and all of them are bijective over
/// the supported set: the UI key (`"cpp"`), the judge's numeric identifier
/// (`"54"`), and the display label (`"C++"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Java,
    JavaScript,
    Python,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::JavaScript,
        Language::Python,
    ];

    /// The key the editor uses to select this language.
    pub fn key(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    /// The numeric identifier the judge expects, as the wire carries it.
    pub fn judge_id(&self) -> &'static str {
        match self {
            Language::C => "50",
            Language::Cpp => "54",
            Language::Java => "62",
            Language::JavaScript => "63",
            Language::Python => "71",
        }
    }

    /// Human-readable label shown in selectors and tables.
    pub fn label(&self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cpp => "C++",
            Language::Java => "Java",
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
        }
    }

    /// Inverse of [`Language::judge_id`].
    pub fn from_judge_id(id: &str) -> Result<Language, ApiTypeError> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.judge_id() == id)
            .ok_or_else(|| ApiTypeError::UnknownLanguageId(id.to_string()))
    }

    /// Starter source seeded into an empty editor buffer on language switch.
    pub fn template(&self) -> &'static str {
        match self {
            Language::C => {
                r#"// C Template
#include <stdio.h>

int add(int a, int b) {
    return a + b;
}

int main(void) {
    printf("Hello, World!\n");
    printf("%d\n", add(5, 3));
    return 0;
}"#
            }
            Language::Cpp => {
                r#"// C++ Template
#include <iostream>

int add(int a, int b) {
    return a + b;
}

int main() {
    std::cout << "Hello, World!" << std::endl;
    std::cout << add(5, 3) << std::endl;
    return 0;
}"#
            }
            Language::Java => {
                r#"// Java Template
public class Main {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
        System.out.println(add(5, 3));
    }

    public static int add(int a, int b) {
        return a + b;
    }
}"#
            }
            Language::JavaScript => {
                r#"// JavaScript Template
console.log("Hello, World!");

function add(a, b) {
  return a + b;
}

console.log(add(5, 3));"#
            }
            Language::Python => {
                r#"# Python Template
print("Hello, World!")

def add(a, b):
    return a + b

print(add(5, 3))"#
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Language {
    type Err = ApiTypeError;

    fn from_str(key: &str) -> Result<Language, ApiTypeError> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.key() == key)
            .ok_or_else(|| ApiTypeError::UnknownLanguageKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_and_judge_id_tables_agree_for_every_language() {
        for lang in Language::ALL {
            assert_eq!(lang.key().parse::<Language>().unwrap(), lang);
            assert_eq!(Language::from_judge_id(lang.judge_id()).unwrap(), lang);
        }
    }

    #[test]
    fn test_cpp_maps_to_54_and_back_to_cpp_label() {
        let lang: Language = "cpp".parse().unwrap();
        assert_eq!(lang.judge_id(), "54");
        assert_eq!(Language::from_judge_id("54").unwrap().label(), "C++");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert_eq!(
            "rust".parse::<Language>(),
            Err(ApiTypeError::UnknownLanguageKey("rust".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_ui_keys() {
        assert_eq!(
            serde_json::to_string(&Language::JavaScript).unwrap(),
            "\"javascript\""
        );
        let lang: Language = serde_json::from_str("\"python\"").unwrap();
        assert_eq!(lang, Language::Python);
    }

    #[test]
    fn test_every_language_has_a_template() {
        for lang in Language::ALL {
            assert!(!lang.template().is_empty());
        }
    }
}
