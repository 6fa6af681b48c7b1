//! End-to-end sends against a template tree on disk.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;

use courier_messenger::{
    AddMessageOptions, Channel, MailEnvelope, MailOptions, MailProvider, MessageData, Messenger, MessengerConfig,
    MsgrError, ProviderError, Providers, PushDevice, PushEnvelope, PushProvider, PushProviders, SendRequest,
    SmsEnvelope, SmsProvider,
};

#[derive(Default)]
struct Recorder {
    mail: Mutex<Vec<MailEnvelope>>,
    sms: Mutex<Vec<SmsEnvelope>>,
    push: Mutex<Vec<PushEnvelope>>,
}

#[async_trait::async_trait]
impl MailProvider for Recorder {
    async fn send(&self, mail: &MailEnvelope) -> Result<(), ProviderError> {
        self.mail.lock().unwrap().push(mail.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

#[async_trait::async_trait]
impl SmsProvider for Recorder {
    async fn send(&self, sms: &SmsEnvelope) -> Result<(), ProviderError> {
        self.sms.lock().unwrap().push(sms.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

#[async_trait::async_trait]
impl PushProvider for Recorder {
    async fn send(&self, push: &PushEnvelope) -> Result<(), ProviderError> {
        self.push.lock().unwrap().push(push.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn template_tree() -> TempDir {
    let dir = TempDir::new().expect("create tempdir");
    let root = dir.path();

    write(
        root,
        "layout_mail.html.tmpl",
        "<html><body>{{ content }}<footer>{{ tl('footer') }}</footer></body></html>",
    );
    write(root, "layout_mail.text.tmpl", "{{ content }}\n--\n{{ tl('footer') }}");
    write(root, "layout_sms.text.tmpl", "{{ content }}");
    write(root, "layout_push.text.tmpl", "{{ content }}");
    write(root, "locale.en.yml", "footer: \"Sent by {{ Brand }}\"\n");
    write(root, "locale.fr.yml", "footer: \"Envoyé par {{ Brand }}\"\n");

    write(root, "welcome/index_mail.html.tmpl", "<p>{{ t('greeting') }}</p>");
    write(root, "welcome/index_mail.text.tmpl", "{{ t('greeting') }}");
    write(root, "welcome/index_sms.text.tmpl", "{{ t('greeting') }} Reply STOP to opt out.");
    write(root, "welcome/index_push.text.tmpl", "{{ t('greeting') }}");
    write(
        root,
        "welcome/locale.en.yml",
        "mail_subject: \"Hello, {{ Name }}!\"\ngreeting: \"Welcome, {{ Name }}\"\npush_title: Welcome\n",
    );
    write(
        root,
        "welcome/locale.fr.yml",
        "mail_subject: \"Bonjour, {{ Name }} !\"\ngreeting: \"Bienvenue, {{ Name }}\"\npush_title: Bienvenue\n",
    );

    dir
}

fn setup(dir: &TempDir) -> (Messenger, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let layout_data: MessageData = serde_json::from_value(json!({"Brand": "Acme"})).unwrap();
    let config = MessengerConfig::new(dir.path())
        .layout_data(layout_data)
        .mail(MailOptions::default().from_address("hello@acme.test"));
    let providers = Providers::new()
        .with_mail(recorder.clone())
        .with_sms(recorder.clone())
        .with_push(PushProviders::new().with_apple(recorder.clone()));

    let messenger = Messenger::new(config, providers).unwrap();
    messenger.add_message(AddMessageOptions::new("welcome")).unwrap();
    (messenger, recorder)
}

fn bob() -> MessageData {
    serde_json::from_value(json!({"Name": "Bob Marley"})).unwrap()
}

#[tokio::test]
async fn welcome_mail_end_to_end() {
    let dir = template_tree();
    let (messenger, recorder) = setup(&dir);

    messenger
        .send(&SendRequest::new("welcome").mail_to("a@b.com").data(bob()))
        .await
        .unwrap();

    let sent = recorder.mail.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let mail = &sent[0];
    assert_eq!(mail.to, "a@b.com");
    assert_eq!(mail.from, "hello@acme.test");
    assert_eq!(mail.subject, "Hello, Bob Marley!");
    assert!(mail.html.contains("<p>Welcome, Bob Marley</p>"), "got: {}", mail.html);
    assert!(mail.html.contains("<footer>Sent by Acme</footer>"), "got: {}", mail.html);
    assert_eq!(mail.text, "Welcome, Bob Marley\n--\nSent by Acme");
}

#[tokio::test]
async fn all_channels_in_one_send() {
    let dir = template_tree();
    let (messenger, recorder) = setup(&dir);

    messenger
        .send(
            &SendRequest::new("welcome")
                .mail_to("a@b.com")
                .sms_to("+15550100")
                .push_to(vec![PushDevice::apple("a-1"), PushDevice::apple("a-2")])
                .data(bob()),
        )
        .await
        .unwrap();

    assert_eq!(recorder.mail.lock().unwrap().len(), 1);

    let sms = recorder.sms.lock().unwrap();
    assert_eq!(sms.len(), 1);
    assert_eq!(sms[0].body, "Welcome, Bob Marley Reply STOP to opt out.");

    let push = recorder.push.lock().unwrap();
    assert_eq!(push.len(), 2);
    assert!(push.iter().all(|p| p.title == "Welcome" && p.body == "Welcome, Bob Marley"));
}

#[tokio::test]
async fn regional_locale_falls_back_to_language() {
    let dir = template_tree();
    let (messenger, recorder) = setup(&dir);

    messenger
        .send(&SendRequest::new("welcome").mail_to("a@b.com").locale("fr_CA").data(bob()))
        .await
        .unwrap();

    let sent = recorder.mail.lock().unwrap();
    let mail = &sent[0];
    assert_eq!(mail.subject, "Bonjour, Bob Marley !");
    assert!(mail.html.contains("Envoyé par Acme"), "got: {}", mail.html);
}

#[tokio::test]
async fn unknown_locale_uses_default() {
    let dir = template_tree();
    let (messenger, recorder) = setup(&dir);

    messenger
        .send(&SendRequest::new("welcome").mail_to("a@b.com").locale("de").data(bob()))
        .await
        .unwrap();

    assert_eq!(recorder.mail.lock().unwrap()[0].subject, "Hello, Bob Marley!");
}

#[tokio::test]
async fn html_data_is_escaped_but_text_is_not() {
    let dir = template_tree();
    let (messenger, recorder) = setup(&dir);
    let data: MessageData = serde_json::from_value(json!({"Name": "<Bob & Co>"})).unwrap();

    messenger
        .send(&SendRequest::new("welcome").mail_to("a@b.com").data(data))
        .await
        .unwrap();

    let sent = recorder.mail.lock().unwrap();
    let mail = &sent[0];
    assert!(mail.html.contains("&lt;Bob &amp; Co&gt;"), "got: {}", mail.html);
    assert!(mail.text.starts_with("Welcome, <Bob & Co>"), "got: {}", mail.text);
}

#[tokio::test]
async fn unknown_message_reaches_no_provider() {
    let dir = template_tree();
    let (messenger, recorder) = setup(&dir);

    let err = messenger
        .send(&SendRequest::new("goodbye").mail_to("a@b.com").sms_to("+1"))
        .await
        .unwrap_err();

    assert!(matches!(err, MsgrError::UnknownMessage(_)));
    assert!(recorder.mail.lock().unwrap().is_empty());
    assert!(recorder.sms.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_template_fails_only_its_channel() {
    let dir = template_tree();
    fs::remove_file(dir.path().join("welcome/index_sms.text.tmpl")).unwrap();
    let (messenger, recorder) = setup(&dir);

    let err = messenger
        .send(&SendRequest::new("welcome").mail_to("a@b.com").sms_to("+1").data(bob()))
        .await
        .unwrap_err();

    let MsgrError::Delivery(errors) = err else {
        panic!("expected delivery errors, got: {err:?}");
    };
    assert_eq!(errors.channels(), vec![Channel::Sms]);
    assert!(matches!(errors.get(Channel::Sms), Some(MsgrError::TemplateNotFound(_))));
    assert_eq!(recorder.mail.lock().unwrap().len(), 1);
    assert!(recorder.sms.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_translation_is_reported() {
    let dir = template_tree();
    write(dir.path(), "welcome/index_sms.text.tmpl", "{{ t('nope') }}");
    let (messenger, _recorder) = setup(&dir);

    let err = messenger
        .send(&SendRequest::new("welcome").sms_to("+1").data(bob()))
        .await
        .unwrap_err();

    let MsgrError::Delivery(errors) = err else {
        panic!("expected delivery errors, got: {err:?}");
    };
    assert!(
        matches!(errors.get(Channel::Sms), Some(MsgrError::MissingTranslation { key, .. }) if key == "nope"),
        "got: {errors}"
    );
}

#[tokio::test]
async fn compose_without_sending() {
    let dir = template_tree();
    let (messenger, recorder) = setup(&dir);

    let content = messenger.compose_mail("welcome", Some("fr"), &bob()).unwrap();
    assert_eq!(content.subject, "Bonjour, Bob Marley !");
    assert!(recorder.mail.lock().unwrap().is_empty());
}
