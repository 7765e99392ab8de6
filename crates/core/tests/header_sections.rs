use std::path::PathBuf;

use codescan_core::services::{detect_header, executable_sections, HeaderKind};
use object::write::Object;
use object::{Architecture, BinaryFormat, Endianness, SectionKind};

fn write_elf(dir: &std::path::Path, code: &[u8]) -> PathBuf {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text_id = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.section_mut(text_id).set_data(code.to_vec(), 16);
    let ro_id = obj.add_section(Vec::new(), b".rodata".to_vec(), SectionKind::ReadOnlyData);
    obj.section_mut(ro_id).append_data(b"hello\x00", 1);

    let path = dir.join("fixture_elf");
    std::fs::write(&path, obj.write().expect("write elf")).expect("store elf");
    path
}

#[test]
fn elf_fixture_reports_only_text_as_executable() {
    let temp = tempfile::tempdir().unwrap();
    let code = [0x55u8, 0x48, 0x89, 0xe5, 0x5d, 0xc3];
    let path = write_elf(temp.path(), &code);

    assert_eq!(detect_header(&path).unwrap(), Some(HeaderKind::Elf));

    let sections = executable_sections(&path).unwrap();
    assert_eq!(sections.keys().collect::<Vec<_>>(), vec![".text"]);
    let text = sections[".text"][0];
    assert_eq!(text.len(), code.len() as u64);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[text.start as usize..text.end as usize], &code);
}

#[test]
fn unknown_formats_have_no_header_and_no_sections() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("notes.txt");
    std::fs::write(&path, b"just some text, not an object file").unwrap();

    assert_eq!(detect_header(&path).unwrap(), None);
    assert!(executable_sections(&path).unwrap().is_empty());
}

#[test]
fn truncated_elf_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("broken");
    std::fs::write(&path, b"\x7fELF\x02\x01\x01").unwrap();
    assert_eq!(detect_header(&path).unwrap(), Some(HeaderKind::Elf));
    assert!(executable_sections(&path).is_err());
}
