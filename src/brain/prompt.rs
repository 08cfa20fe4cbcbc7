// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Persona system prompt

/// System prompt shared by every vendor
pub fn persona_prompt(user_name: &str) -> String {
    format!(
        "You are Echo, a highly sophisticated, human-like AI agent. \
         Your personality is professional, slightly witty, and exceptionally helpful. \
         The person you are assisting is named {}. Use this name naturally in conversation. \
         You have control over the user's system and can perform various tasks like opening apps, \
         managing files, and searching the web. \
         Keep your spoken responses concise, elegant, and ready for text-to-speech.",
        user_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_user() {
        let prompt = persona_prompt("Ada");
        assert!(prompt.starts_with("You are Echo"));
        assert!(prompt.contains("The person you are assisting is named Ada."));
        assert!(prompt.ends_with("ready for text-to-speech."));
    }
}
