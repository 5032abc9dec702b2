//! Lua-facing behavior of the raw file API

mod common;

use common::{args, build_corrupted_zip, write_archive};
use satchel::api::collect_abandoned;
use satchel::{Bootstrapper, Result, Runtime};
use tempfile::{tempdir, TempDir};

const PAYLOAD: &[u8] = b"0123456789abcdef";

fn boot_with_payload() -> (TempDir, Runtime) {
    let dir = tempdir().unwrap();
    let archive = write_archive(
        dir.path(),
        "app.zip",
        &[
            ("init.lua", b"satchel = require 'satchel'"),
            ("data/payload.bin", PAYLOAD),
            ("data/empty.bin", b""),
        ],
    );
    let runtime = Bootstrapper::new()
        .with_base_dir(dir.path())
        .boot(&args(&["interp", archive.to_str().unwrap()]))
        .unwrap();
    runtime.execute::<()>().unwrap();
    (dir, runtime)
}

#[test]
fn test_open_missing_returns_nil_and_message() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();

    let (handle_is_nil, message): (bool, String) = runtime
        .lua()
        .load("local f, err = satchel.open('/nope.txt', 'rb') return f == nil, err")
        .eval()?;
    assert!(handle_is_nil);
    assert_eq!(message, "couldn't open file: '/nope.txt'");
    Ok(())
}

#[test]
fn test_sequential_reads_reach_end_of_file() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();

    let (first, second, rest, after): (String, String, Option<String>, Option<String>) = runtime
        .lua()
        .load(
            r#"
            local f = assert(satchel.open('/data/payload.bin', 'rb'))
            local a = f:read(4)
            local b = f:read(8)
            local c = f:read(100)
            local d = f:read(1)
            f:close()
            return a, b, c, d
            "#,
        )
        .eval()?;

    assert_eq!(first, "0123");
    assert_eq!(second, "456789ab");
    assert_eq!(rest.as_deref(), Some("cdef"));
    assert_eq!(after, None);
    Ok(())
}

#[test]
fn test_read_all_at_end_returns_empty_string() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();

    let (all, again, zero_at_eof): (String, String, Option<String>) = runtime
        .lua()
        .load(
            r#"
            local f = assert(satchel.open('/data/payload.bin'))
            local all = f:read('*a')
            local again = f:read('*a')
            local zero = f:read(0)
            f:close()
            return all, again, zero
            "#,
        )
        .eval()?;

    assert_eq!(all.as_bytes(), PAYLOAD);
    assert_eq!(again, "");
    assert_eq!(zero_at_eof, None);
    Ok(())
}

#[test]
fn test_empty_file() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();

    let (all, bytes): (String, Option<String>) = runtime
        .lua()
        .load(
            r#"
            local f = assert(satchel.open('/data/empty.bin'))
            local all = f:read('*a')
            local bytes = f:read(10)
            f:close()
            return all, bytes
            "#,
        )
        .eval()?;

    assert_eq!(all, "");
    assert_eq!(bytes, None);
    Ok(())
}

#[test]
fn test_closed_handle_raises() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();

    let (closed, read_ok, read_err, close_ok, close_err): (bool, bool, String, bool, String) =
        runtime
            .lua()
            .load(
                r#"
                local f = assert(satchel.open('/data/payload.bin'))
                local closed = f:close()
                local read_ok, read_err = pcall(f.read, f, 1)
                local close_ok, close_err = pcall(f.close, f)
                return closed, read_ok, tostring(read_err), close_ok, tostring(close_err)
                "#,
            )
            .eval()?;

    assert!(closed);
    assert!(!read_ok);
    assert!(read_err.contains("attempt to use a closed file"));
    assert!(!close_ok);
    assert!(close_err.contains("attempt to use a closed file"));
    Ok(())
}

#[test]
fn test_invalid_arguments_raise() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();

    let messages: Vec<String> = runtime
        .lua()
        .load(
            r#"
            local messages = {}
            local function capture(...)
                local ok, err = pcall(...)
                assert(not ok)
                messages[#messages + 1] = tostring(err)
            end
            capture(satchel.open, '/data/payload.bin', 'wb')
            local f = assert(satchel.open('/data/payload.bin'))
            capture(f.read, f, -1)
            capture(f.read, f, '*l')
            capture(f.read, f, true)
            f:close()
            return messages
            "#,
        )
        .eval()?;

    assert_eq!(messages.len(), 4);
    assert!(messages[0].contains("bad argument #2 to 'open' (invalid option 'wb')"));
    assert!(messages[1].contains("negative number of bytes"));
    assert!(messages[2].contains("invalid option '*l'"));
    assert!(messages[3].contains("bad argument #1 to 'read' (number or '*a' expected)"));
    Ok(())
}

#[test]
fn test_read_without_argument_reads_everything() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();

    let (head, rest, at_end): (String, String, String) = runtime
        .lua()
        .load(
            r#"
            local f = assert(satchel.open('/data/payload.bin'))
            local head = f:read(6)
            local rest = f:read()
            local at_end = f:read()
            f:close()
            return head, rest, at_end
            "#,
        )
        .eval()?;

    assert_eq!(head, "012345");
    assert_eq!(rest, "6789abcdef");
    assert_eq!(at_end, "");
    Ok(())
}

#[test]
fn test_corrupted_entry_raises_on_open() -> Result<()> {
    let dir = tempdir()?;
    let payload: &[u8] = b"bytes that no longer match their checksum";
    let path = dir.path().join("app.zip");
    std::fs::write(
        &path,
        build_corrupted_zip(
            &[
                ("init.lua", b"satchel = require 'satchel'"),
                ("corrupt.bin", payload),
            ],
            payload,
        ),
    )?;
    let runtime = Bootstrapper::new()
        .with_base_dir(dir.path())
        .boot(&args(&["interp", path.to_str().unwrap()]))?;
    runtime.execute::<()>()?;

    let (ok, message, missing_is_nil): (bool, String, bool) = runtime
        .lua()
        .load(
            r#"
            local ok, err = pcall(satchel.open, '/corrupt.bin')
            local missing = satchel.open('/absent.bin')
            return ok, tostring(err), missing == nil
            "#,
        )
        .eval()?;

    assert!(!ok);
    assert!(message.contains("error reading file"));
    assert!(missing_is_nil);
    Ok(())
}

#[test]
fn test_abandoned_handles_are_collected() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();
    let lua = runtime.lua();

    lua.load(
        r#"
        for _ = 1, 64 do
            local f = assert(satchel.open('/data/payload.bin'))
            f:read(2)
        end
        "#,
    )
    .exec()?;
    collect_abandoned(lua)?;

    let text: String = lua
        .load("local f = satchel.open('/data/payload.bin') local s = f:read(4) f:close() return s")
        .eval()?;
    assert_eq!(text, "0123");
    Ok(())
}

#[test]
fn test_tostring_reports_state() -> Result<()> {
    let (_dir, runtime) = boot_with_payload();

    let (open, closed): (String, String) = runtime
        .lua()
        .load(
            r#"
            local f = assert(satchel.open('/data/payload.bin'))
            local open = tostring(f)
            f:close()
            return open, tostring(f)
            "#,
        )
        .eval()?;

    assert_eq!(open, "satchel.file (/data/payload.bin)");
    assert_eq!(closed, "satchel.file (closed)");
    Ok(())
}
