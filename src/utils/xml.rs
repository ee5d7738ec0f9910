// 微信支付XML编解码
// 回调报文是扁平的 <xml><field>value</field>...</xml> 结构

use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;

/// 解析微信回调XML为有序键值映射
///
/// 只识别根节点下一层的扁平字段, 文本与CDATA都接受。
/// BTreeMap 的键序正好是签名要求的字典序。
pub fn parse_notify_xml(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut reader = Reader::from_str(raw);
    let mut fields = BTreeMap::new();
    let mut depth = 0usize;
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                depth += 1;
                if depth == 2 {
                    current = Some(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    current = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(text)) => {
                if let Some(name) = &current {
                    let value = text
                        .unescape()
                        .map_err(|e| anyhow::anyhow!("Malformed XML text: {}", e))?;
                    let value = value.trim();
                    if !value.is_empty() {
                        fields.insert(name.clone(), value.to_string());
                    }
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some(name) = &current {
                    let value = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    fields.insert(name.clone(), value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => anyhow::bail!("Malformed XML body: {}", e),
        }
    }

    if fields.is_empty() {
        anyhow::bail!("XML body contains no fields");
    }
    Ok(fields)
}

/// 构造微信应答XML
///
/// 微信要求返回格式良好的XML, 字段值用CDATA包裹。
pub fn build_ack_xml(return_code: &str, return_msg: &str) -> String {
    format!(
        "<xml><return_code><![CDATA[{}]]></return_code><return_msg><![CDATA[{}]]></return_msg></xml>",
        return_code, return_msg
    )
}
