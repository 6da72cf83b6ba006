use std::sync::LazyLock;

use regex::Regex;

use shopcall_types::models::Message;

/// The system welcome/menu banner template. Banners are exempt from
/// feedback controls.
static WELCOME_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("歡迎來到.*！我是你的 AI 小幫手，你可以先從選單了解我們的服務～")
        .expect("welcome template compiles")
});

/// True for system-generated welcome/menu banners, false for ordinary
/// messages. Pure content test; no state.
pub fn is_banner(message: &Message) -> bool {
    WELCOME_TEMPLATE.is_match(&message.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopcall_types::models::{Feedback, Sender};

    fn shop_message(content: &str) -> Message {
        Message {
            id: "m1".into(),
            content: content.into(),
            created_at: None,
            sender: Sender::Shop,
            quick_reply_menu: false,
            feedback: Feedback::Unset,
            seq: 0,
        }
    }

    #[test]
    fn welcome_banner_matches_for_any_shop_name() {
        let banner = shop_message(
            "歡迎來到momo商店！我是你的 AI 小幫手，你可以先從選單了解我們的服務～",
        );
        assert!(is_banner(&banner));
    }

    #[test]
    fn ordinary_replies_are_not_banners() {
        assert!(!is_banner(&shop_message("訂單編號是20240823153700")));
        assert!(!is_banner(&shop_message("歡迎來到本店！")));
    }
}
