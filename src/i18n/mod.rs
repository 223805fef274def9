//! Internationalization (i18n) module.
//!
//! Provides localized strings for prompts and console output.
//! English is the default language; Russian is available as an alternative.

use std::sync::OnceLock;

static CURRENT_LANG: OnceLock<Lang> = OnceLock::new();

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// English (default)
    En,
    /// Russian
    Ru,
}

impl Lang {
    /// Parse a language code string (e.g. "en", "ru", "en_US", "ru_RU.UTF-8").
    /// Returns `None` for unrecognized codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.to_lowercase();
        let prefix = normalized.split(['_', '-', '.']).next().unwrap_or("");
        match prefix {
            "en" => Some(Self::En),
            "ru" => Some(Self::Ru),
            _ => None,
        }
    }

    /// Return the ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
        }
    }
}

/// Initialize the global language. Call once at startup.
/// If already initialized, this is a no-op.
pub fn set_lang(lang: Lang) {
    let _ = CURRENT_LANG.set(lang);
}

/// Get the currently configured language (defaults to English).
pub fn lang() -> Lang {
    CURRENT_LANG.get().copied().unwrap_or(Lang::En)
}

/// Detect language from `IMAPDUMP_LANG`, then `LC_MESSAGES` / `LANG`.
pub fn detect_system_lang() -> Lang {
    std::env::var("IMAPDUMP_LANG")
        .ok()
        .and_then(|v| Lang::from_code(&v))
        .or_else(|| {
            std::env::var("LC_MESSAGES")
                .ok()
                .and_then(|v| Lang::from_code(&v))
        })
        .or_else(|| std::env::var("LANG").ok().and_then(|v| Lang::from_code(&v)))
        .unwrap_or(Lang::En)
}

/// Macro for defining translatable message functions.
/// Each function returns a `&'static str` based on the current language.
macro_rules! msg {
    ($name:ident, $en:expr, $ru:expr) => {
        /// Returns a localized string for the current language.
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::Ru => $ru,
            }
        }
    };
}

// ── General ──────────────────────────────────────────────────────

msg!(
    app_about,
    "imapdump \u{2014} download every message of your IMAP inboxes into per-message folders.",
    "imapdump \u{2014} сохраняет все письма из папки «Входящие» в отдельные папки."
);
msg!(
    app_after_help,
    "Accounts are read from a file with one 'login;password' per line.\nWithout that file a single account is asked for interactively.",
    "Учетные записи читаются из файла, по одной строке 'логин;пароль'.\nЕсли файла нет, данные одной учетной записи запрашиваются интерактивно."
);

// ── CLI help strings ─────────────────────────────────────────────

msg!(
    help_cmd_run,
    "Archive every account (default if no subcommand given)",
    "Сохранить письма всех учетных записей (по умолчанию)"
);
msg!(
    help_cmd_import,
    "Archive local .eml files as if they came from one mailbox",
    "Сохранить локальные файлы .eml как письма одного ящика"
);
msg!(
    help_cmd_completions,
    "Generate shell completions",
    "Сгенерировать автодополнение для оболочки"
);
msg!(
    help_cmd_manpage,
    "Generate a man page",
    "Сгенерировать man-страницу"
);

// ── Prompts ──────────────────────────────────────────────────────

msg!(prompt_email, "Enter your e-mail:", "Введите ваш e-mail:");
msg!(prompt_password, "Enter your password:", "Введите ваш пароль:");

// ── Progress output ──────────────────────────────────────────────

msg!(msg_total_messages, "Total messages for", "Всего сообщений для");
msg!(msg_saving, "Saving messages for", "Сохранение сообщений для");
msg!(
    msg_account_done,
    "Finished processing messages for",
    "Обработка сообщений завершена для"
);
msg!(
    msg_no_credentials_file,
    "No account list found, asking for a single account.",
    "Список учетных записей не найден, введите одну учетную запись."
);
msg!(msg_summary, "Summary", "Итог");
msg!(msg_accounts, "Accounts", "Учетные записи");
msg!(msg_archived, "Messages saved", "Сохранено писем");
msg!(msg_failed, "Messages failed", "Ошибок при сохранении");
msg!(msg_attachments, "Attachments", "Вложения");
msg!(msg_written, "Written", "Записано");
msg!(msg_output, "Output", "Каталог");

// ── Errors ───────────────────────────────────────────────────────

msg!(
    err_list_failed,
    "Could not retrieve messages for",
    "Не удалось получить сообщения для"
);
msg!(
    err_auth_failed,
    "Cannot log in to account",
    "Не могу авторизоваться в учетной записи"
);
msg!(
    err_auth_hint,
    "the login or password may be wrong.\n A newly issued application password only starts working after 2\u{2013}3 hours.\n Also check that access to the mailbox from mail clients is allowed in the mailbox settings ('All settings > Mail clients').",
    "возможно неверный Логин или Пароль!\n Не забывайте что новый пароль приложений начнет действовать только через 2\u{2013}3 часа!\n Так же возможно что в разделе 'Все настройки > Почтовые программы' не указано 'Разрешить доступ к почтовому ящику с помощью почтовых клиентов'"
);
msg!(
    err_no_account,
    "No account given",
    "Учетная запись не указана"
);
msg!(
    err_no_files,
    "No .eml files to import",
    "Нет файлов .eml для импорта"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_from_code() {
        assert_eq!(Lang::from_code("en"), Some(Lang::En));
        assert_eq!(Lang::from_code("ru"), Some(Lang::Ru));
        assert_eq!(Lang::from_code("en_US"), Some(Lang::En));
        assert_eq!(Lang::from_code("ru_RU.UTF-8"), Some(Lang::Ru));
        assert_eq!(Lang::from_code("RU-ru"), Some(Lang::Ru));
        assert_eq!(Lang::from_code("fr"), None);
    }

    #[test]
    fn test_lang_code_roundtrip() {
        assert_eq!(Lang::from_code(Lang::En.code()), Some(Lang::En));
        assert_eq!(Lang::from_code(Lang::Ru.code()), Some(Lang::Ru));
    }

    #[test]
    fn test_messages_return_strings() {
        // In tests, OnceLock may already be set, so only check the strings exist
        assert!(!app_about().is_empty());
        assert!(!prompt_email().is_empty());
        assert!(!err_auth_hint().is_empty());
        assert!(!msg_account_done().is_empty());
    }
}
