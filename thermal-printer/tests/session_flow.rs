use thermal_printer::{
    CharacterProfile, CutMode, MemoryPrinter, PrintError, PrintService, PrintSettings,
    PrinterSession, decode, encode_strict,
};

const SELECT_CP1252: [u8; 3] = [0x1B, 0x74, 16];

fn settings() -> PrintSettings {
    PrintSettings::default()
}

#[test]
fn test_hello_is_printed_cut_and_closed() {
    let printer = MemoryPrinter::new();

    let outcome = PrinterSession::scoped(&printer, settings(), |session| {
        session.print_text("Hello", CharacterProfile::Cp1252)?;
        session.cut()?;
        Ok(session.outcome())
    })
    .expect("print should succeed");

    let writes = printer.writes();
    assert_eq!(writes[0], SELECT_CP1252);
    assert_eq!(writes[1], encode_strict("Hello", CharacterProfile::Cp1252).unwrap());

    let cuts = writes
        .iter()
        .filter(|w| w.starts_with(&[0x1D, 0x56]))
        .count();
    assert_eq!(cuts, 1);
    assert!(outcome.cut);
    assert_eq!(printer.closes(), 1);
}

#[test]
fn test_norwegian_text_differs_from_utf8() {
    let printer = MemoryPrinter::new();
    let text = "Blåbærsyltetøy";

    PrinterSession::scoped(&printer, settings(), |session| {
        session.print_text(text, CharacterProfile::Cp1252)
    })
    .expect("CP1252 covers å, æ and ø");

    let written = printer.writes()[1].clone();
    assert_eq!(
        written,
        vec![
            b'B', b'l', 0xE5, b'b', 0xE6, b'r', b's', b'y', b'l', b't', b'e', b't', 0xF8, b'y'
        ]
    );
    assert_ne!(written, text.as_bytes());
    assert_eq!(decode(&written, CharacterProfile::Cp1252), text);
}

#[test]
fn test_japanese_text_writes_nothing() {
    let printer = MemoryPrinter::new();

    let result = PrinterSession::scoped(&printer, settings(), |session| {
        session.print_text("Hei 日本語", CharacterProfile::Cp1252)
    });

    match result {
        Err(PrintError::Encoding {
            character,
            position,
            ..
        }) => {
            assert_eq!(character, '日');
            assert_eq!(position, 4);
        }
        other => panic!("expected encoding error, got {other:?}"),
    }
    assert!(printer.bytes().is_empty());
    assert_eq!(printer.closes(), 1);
}

#[test]
fn test_missing_device_short_circuits() {
    let printer = MemoryPrinter::missing();
    let mut job_ran = false;

    let result = PrinterSession::scoped(&printer, settings(), |session| {
        job_ran = true;
        session.print_text("Hello", CharacterProfile::Cp1252)
    });

    assert!(matches!(result, Err(PrintError::DeviceNotFound(_))));
    assert!(!job_ran);
    assert_eq!(printer.opens(), 0);
    assert_eq!(printer.closes(), 0);
    assert!(printer.bytes().is_empty());
}

#[test]
fn test_permission_error_on_open() {
    let printer = MemoryPrinter::denied();
    let result = PrinterSession::open(&printer, settings());
    assert!(matches!(result, Err(PrintError::Permission(_))));
}

#[test]
fn test_close_is_idempotent() {
    let printer = MemoryPrinter::new();
    let mut session = PrinterSession::open(&printer, settings()).unwrap();
    session.print_text("x", CharacterProfile::Cp1252).unwrap();
    session.close();
    session.close();
    drop(session);

    assert_eq!(printer.closes(), 1);
}

#[test]
fn test_failed_write_still_releases_device() {
    // code table select succeeds, text write fails
    let printer = MemoryPrinter::new().fail_writes_after(1);

    let result = PrinterSession::scoped(&printer, settings(), |session| {
        session.print_text("Hello", CharacterProfile::Cp1252)?;
        session.cut()
    });

    assert!(matches!(result, Err(PrintError::Io(_))));
    assert_eq!(printer.writes().len(), 1);
    assert_eq!(printer.closes(), 1);
}

#[test]
fn test_no_cut_when_disabled() {
    let printer = MemoryPrinter::new();
    let settings = PrintSettings {
        cut: CutMode::None,
        ..settings()
    };

    PrinterSession::scoped(&printer, settings, |session| {
        session.print_text("Hello", CharacterProfile::Cp1252)?;
        session.cut()
    })
    .unwrap();

    assert!(!printer.bytes().windows(2).any(|w| w == [0x1D, 0x56]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_service_serialises_jobs() {
    let printer = MemoryPrinter::new();
    let service = PrintService::new(printer.clone(), settings());

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.print_text(format!("job {i}\n"), true).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Each job is select + text + cut, never interleaved with another job
    let writes = printer.writes();
    assert_eq!(writes.len(), 24);
    for job in writes.chunks(3) {
        assert_eq!(job[0], SELECT_CP1252);
        assert!(job[1].starts_with(b"job "));
        assert_eq!(job[2], vec![0x1D, 0x56, 0x42, 3]);
    }
    assert_eq!(printer.opens(), 8);
    assert_eq!(printer.closes(), 8);
}
